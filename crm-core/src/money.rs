//! JSON encoding for monetary values.
//!
//! Money travels as a plain JSON number in both directions. Strings such as
//! `"12.5"` are rejected, so every deal field decodes the same way.
//!
//! Use with `#[serde(with = "crate::money")]`, or `crate::money::patch` for a
//! [`Patch<Decimal>`] field.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Unexpected, Visitor};
use serde::ser::Error as _;
use serde::{Deserializer, Serializer};

use crate::patch::Patch;

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON number")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Decimal, E> {
        Ok(Decimal::from(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Decimal, E> {
        Ok(Decimal::from(value))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Decimal, E> {
        Decimal::from_str(&value.to_string())
            .map_err(|_| E::invalid_value(Unexpected::Float(value), &self))
    }
}

pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    let float = value
        .to_f64()
        .ok_or_else(|| S::Error::custom(format!("{} has no f64 form", value)))?;
    serializer.serialize_f64(float)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    deserializer.deserialize_f64(MoneyVisitor)
}

/// The same encoding for a partial-update field. Absent keys are left to
/// `#[serde(default)]` and `skip_serializing_if`.
pub mod patch {
    use super::*;

    struct MoneyPatchVisitor;

    impl<'de> Visitor<'de> for MoneyPatchVisitor {
        type Value = Patch<Decimal>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a JSON number or null")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Patch::Null)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Patch::Null)
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
            super::deserialize(deserializer).map(Patch::Value)
        }
    }

    pub fn serialize<S: Serializer>(patch: &Patch<Decimal>, serializer: S) -> Result<S::Ok, S::Error> {
        match patch.value() {
            Some(value) => super::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Patch<Decimal>, D::Error> {
        deserializer.deserialize_option(MoneyPatchVisitor)
    }
}
