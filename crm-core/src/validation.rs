//! Validation Traits
//!
//! Field-level checks shared by the command inputs.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::patch::Patch;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Trait for validating non-empty strings.
///
/// # Example
/// ```ignore
/// use crm_core::validation::ValidateNonEmpty;
///
/// input.name.validate_non_empty("name")?;
/// ```
pub trait ValidateNonEmpty {
    /// Fails with `RequiredFieldMissing` if the value is empty or whitespace-only.
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        if self.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: field_name.to_string(),
            });
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        self.as_str().validate_non_empty(field_name)
    }
}

/// A required field in a patch may be absent but never null or blank.
impl ValidateNonEmpty for Patch<String> {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ValidationError> {
        self.require_non_null(field_name)?;
        match self.value() {
            Some(value) => value.validate_non_empty(field_name),
            None => Ok(()),
        }
    }
}

/// Trait for validating email addresses.
pub trait ValidateEmail {
    fn validate_email(&self, field_name: &str) -> Result<(), ValidationError>;
}

impl ValidateEmail for str {
    fn validate_email(&self, field_name: &str) -> Result<(), ValidationError> {
        if !EMAIL_PATTERN.is_match(self) {
            return Err(ValidationError::InvalidFormat {
                field: field_name.to_string(),
                expected: "email address".to_string(),
            });
        }
        Ok(())
    }
}

impl ValidateEmail for Option<String> {
    fn validate_email(&self, field_name: &str) -> Result<(), ValidationError> {
        match self {
            Some(value) => value.validate_email(field_name),
            None => Ok(()),
        }
    }
}

impl ValidateEmail for Patch<String> {
    fn validate_email(&self, field_name: &str) -> Result<(), ValidationError> {
        match self.value() {
            Some(value) => value.validate_email(field_name),
            None => Ok(()),
        }
    }
}

/// Integer digits a stored monetary value may carry (NUMERIC(15,2)).
pub const MONEY_INTEGER_DIGITS: u32 = 13;

/// Trait for validating monetary amounts.
pub trait ValidateAmount {
    fn validate_non_negative(&self, field_name: &str) -> Result<(), ValidationError>;

    /// Reject values with more than [`MONEY_INTEGER_DIGITS`] integer digits.
    fn validate_money_range(&self, field_name: &str) -> Result<(), ValidationError>;
}

impl ValidateAmount for Decimal {
    fn validate_non_negative(&self, field_name: &str) -> Result<(), ValidationError> {
        if self.is_sign_negative() && !self.is_zero() {
            return Err(ValidationError::InvalidValue {
                field: field_name.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }

    fn validate_money_range(&self, field_name: &str) -> Result<(), ValidationError> {
        let limit = Decimal::from(10i64.pow(MONEY_INTEGER_DIGITS));
        if self.abs() >= limit {
            return Err(ValidationError::InvalidValue {
                field: field_name.to_string(),
                reason: format!("must be less than {}", limit),
            });
        }
        Ok(())
    }
}

/// Trait for checking if an update command has any fields set.
pub trait HasUpdates {
    /// Check if any update fields are present.
    fn has_any_updates(&self) -> bool;
}
