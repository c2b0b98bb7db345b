//! Tri-state field patches for partial updates.
//!
//! A patch field is either absent from the command (leave the stored value
//! alone), explicitly null (clear it), or carries a value (overwrite).
//! With serde, a missing key decodes to [`Patch::Absent`] as long as the
//! field is marked `#[serde(default)]`; `null` decodes to [`Patch::Null`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A single field of a partial-update command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Not mentioned by the command.
    Absent,
    /// Present with a null value.
    Null,
    /// Present with a concrete value.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Patch::Null)
    }

    /// The concrete value, if one was sent.
    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Patch<&T> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(v),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Patch<U> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }

    /// Merge into a nullable field.
    pub fn apply(self, current: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Null => *current = None,
            Patch::Value(v) => *current = Some(v),
        }
    }

    /// Merge into a required field; null is rejected.
    pub fn apply_required(self, current: &mut T, field: &str) -> Result<(), ValidationError> {
        match self {
            Patch::Absent => Ok(()),
            Patch::Null => Err(ValidationError::NullNotAllowed {
                field: field.to_string(),
            }),
            Patch::Value(v) => {
                *current = v;
                Ok(())
            }
        }
    }

    /// Reject an explicit null without consuming the patch.
    pub fn require_non_null(&self, field: &str) -> Result<(), ValidationError> {
        if self.is_null() {
            return Err(ValidationError::NullNotAllowed {
                field: field.to_string(),
            });
        }
        Ok(())
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Value(v) => serializer.serialize_some(v),
            // Absent fields are expected to be skipped by the container.
            Patch::Null | Patch::Absent => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}
