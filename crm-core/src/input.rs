//! Command inputs for creating and partially updating entities.
//!
//! Create inputs carry every writable field; patch inputs carry a
//! [`Patch`] per field. Both are checked with `validated()` before they
//! reach the store.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::patch::Patch;
use crate::validation::{HasUpdates, ValidateAmount, ValidateEmail, ValidateNonEmpty};
use crate::{DealStage, EntityId, Timestamp};

/// Decimal places kept for monetary values.
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary value to the stored precision.
pub fn normalize_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

// ============================================================================
// COMPANY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewCompany {
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewCompany {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            industry: None,
            website: None,
            phone: None,
            email: None,
            address: None,
        }
    }

    pub fn validated(self) -> Result<Self, ValidationError> {
        self.name.validate_non_empty("name")?;
        self.email.validate_email("email")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CompanyPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub industry: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub website: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub phone: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub email: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub address: Patch<String>,
}

impl CompanyPatch {
    pub fn validated(self) -> Result<Self, ValidationError> {
        self.name.validate_non_empty("name")?;
        self.email.validate_email("email")?;
        Ok(self)
    }
}

impl HasUpdates for CompanyPatch {
    fn has_any_updates(&self) -> bool {
        self.name.is_present()
            || self.industry.is_present()
            || self.website.is_present()
            || self.phone.is_present()
            || self.email.is_present()
            || self.address.is_present()
    }
}

// ============================================================================
// CONTACT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company_id: Option<EntityId>,
}

impl NewContact {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            phone: None,
            job_title: None,
            company_id: None,
        }
    }

    pub fn validated(self) -> Result<Self, ValidationError> {
        self.first_name.validate_non_empty("first_name")?;
        self.last_name.validate_non_empty("last_name")?;
        self.email.validate_email("email")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ContactPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub first_name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub last_name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub email: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub phone: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub job_title: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub company_id: Patch<EntityId>,
}

impl ContactPatch {
    pub fn validated(self) -> Result<Self, ValidationError> {
        self.first_name.validate_non_empty("first_name")?;
        self.last_name.validate_non_empty("last_name")?;
        self.email.validate_email("email")?;
        Ok(self)
    }
}

impl HasUpdates for ContactPatch {
    fn has_any_updates(&self) -> bool {
        self.first_name.is_present()
            || self.last_name.is_present()
            || self.email.is_present()
            || self.phone.is_present()
            || self.job_title.is_present()
            || self.company_id.is_present()
    }
}

// ============================================================================
// DEAL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewDeal {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "crate::money")]
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub value: Decimal,
    pub stage: DealStage,
    pub contact_id: EntityId,
    pub company_id: EntityId,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub expected_close_date: Option<Timestamp>,
}

impl NewDeal {
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.title.validate_non_empty("title")?;
        self.value.validate_non_negative("value")?;
        self.value = normalize_money(self.value);
        self.value.validate_money_range("value")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DealPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub title: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub description: Patch<String>,
    #[serde(default, with = "crate::money::patch", skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<f64>))]
    pub value: Patch<Decimal>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<DealStage>))]
    pub stage: Patch<DealStage>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub contact_id: Patch<EntityId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub company_id: Patch<EntityId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub expected_close_date: Patch<Timestamp>,
}

impl DealPatch {
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.title.validate_non_empty("title")?;
        self.value.require_non_null("value")?;
        self.stage.require_non_null("stage")?;
        self.contact_id.require_non_null("contact_id")?;
        self.company_id.require_non_null("company_id")?;
        if let Some(value) = self.value.value() {
            value.validate_non_negative("value")?;
        }
        self.value = self.value.map(normalize_money);
        if let Some(value) = self.value.value() {
            value.validate_money_range("value")?;
        }
        Ok(self)
    }
}

impl HasUpdates for DealPatch {
    fn has_any_updates(&self) -> bool {
        self.title.is_present()
            || self.description.is_present()
            || self.value.is_present()
            || self.stage.is_present()
            || self.contact_id.is_present()
            || self.company_id.is_present()
            || self.expected_close_date.is_present()
    }
}

// ============================================================================
// TASK
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub due_date: Option<Timestamp>,
    #[serde(default)]
    pub contact_id: Option<EntityId>,
    #[serde(default)]
    pub company_id: Option<EntityId>,
    #[serde(default)]
    pub deal_id: Option<EntityId>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            completed: false,
            due_date: None,
            contact_id: None,
            company_id: None,
            deal_id: None,
        }
    }

    pub fn validated(self) -> Result<Self, ValidationError> {
        self.title.validate_non_empty("title")?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub title: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<bool>))]
    pub completed: Patch<bool>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub due_date: Patch<Timestamp>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub contact_id: Patch<EntityId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub company_id: Patch<EntityId>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub deal_id: Patch<EntityId>,
}

impl TaskPatch {
    pub fn validated(self) -> Result<Self, ValidationError> {
        self.title.validate_non_empty("title")?;
        self.completed.require_non_null("completed")?;
        Ok(self)
    }
}

impl HasUpdates for TaskPatch {
    fn has_any_updates(&self) -> bool {
        self.title.is_present()
            || self.description.is_present()
            || self.completed.is_present()
            || self.due_date.is_present()
            || self.contact_id.is_present()
            || self.company_id.is_present()
            || self.deal_id.is_present()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_normalize_money() {
        assert_eq!(normalize_money(dec("10")).to_string(), "10.00");
        assert_eq!(normalize_money(dec("0.005")).to_string(), "0.01");
        assert_eq!(normalize_money(dec("1.234")).to_string(), "1.23");
        assert_eq!(normalize_money(dec("999999.99")).to_string(), "999999.99");
    }

    #[test]
    fn test_new_company_requires_name() {
        let err = NewCompany::new("  ").validated().unwrap_err();
        assert_eq!(err.field(), "name");
    }

    #[test]
    fn test_new_company_rejects_bad_email() {
        let mut input = NewCompany::new("Acme");
        input.email = Some("invalid-email".to_string());
        assert!(matches!(
            input.validated(),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_new_deal_rejects_negative_value() {
        let input = NewDeal {
            title: "Deal".to_string(),
            description: None,
            value: dec("-1"),
            stage: DealStage::NewLead,
            contact_id: 1,
            company_id: 1,
            expected_close_date: None,
        };
        let err = input.validated().unwrap_err();
        assert_eq!(err.field(), "value");
    }

    #[test]
    fn test_new_deal_accepts_numeric_json_value() {
        let input: NewDeal = serde_json::from_value(json!({
            "title": "Renewal",
            "value": 999999.99,
            "stage": "Proposal Sent",
            "contact_id": 1,
            "company_id": 2
        }))
        .unwrap();
        let input = input.validated().unwrap();
        assert_eq!(input.value, dec("999999.99"));
        assert_eq!(input.stage, DealStage::ProposalSent);
        assert_eq!(input.description, None);
    }

    #[test]
    fn test_new_deal_rejects_unknown_stage() {
        let result = serde_json::from_value::<NewDeal>(json!({
            "title": "Renewal",
            "value": 10,
            "stage": "Closed",
            "contact_id": 1,
            "company_id": 2
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_task_completed_defaults_false() {
        let input: NewTask = serde_json::from_value(json!({ "title": "Call" })).unwrap();
        assert!(!input.completed);
        assert_eq!(input.deal_id, None);
    }

    #[test]
    fn test_company_patch_decodes_tristate() {
        let patch: CompanyPatch =
            serde_json::from_value(json!({ "name": "Acme Inc", "industry": null })).unwrap();
        assert_eq!(patch.name, Patch::Value("Acme Inc".to_string()));
        assert_eq!(patch.industry, Patch::Null);
        assert_eq!(patch.website, Patch::Absent);
        assert!(patch.has_any_updates());
        assert!(!CompanyPatch::default().has_any_updates());
    }

    #[test]
    fn test_company_patch_rejects_null_name() {
        let patch: CompanyPatch = serde_json::from_value(json!({ "name": null })).unwrap();
        assert!(matches!(
            patch.validated(),
            Err(ValidationError::NullNotAllowed { .. })
        ));
    }

    #[test]
    fn test_deal_patch_rejects_null_required_fk() {
        let patch: DealPatch = serde_json::from_value(json!({ "company_id": null })).unwrap();
        let err = patch.validated().unwrap_err();
        assert_eq!(err.field(), "company_id");
    }

    #[test]
    fn test_deal_patch_normalizes_value() {
        let patch: DealPatch = serde_json::from_value(json!({ "value": 12.5 })).unwrap();
        let patch = patch.validated().unwrap();
        assert_eq!(patch.value, Patch::Value(dec("12.50")));
    }

    #[test]
    fn test_deal_value_must_fit_numeric_15_2() {
        let deal = |value: &str| NewDeal {
            title: "Deal".to_string(),
            description: None,
            value: dec(value),
            stage: DealStage::NewLead,
            contact_id: 1,
            company_id: 1,
            expected_close_date: None,
        };
        assert_eq!(
            deal("9999999999999.99").validated().unwrap().value,
            dec("9999999999999.99")
        );
        assert_eq!(
            deal("10000000000000").validated().unwrap_err().field(),
            "value"
        );
        assert!(deal("9999999999999.995").validated().is_err());

        let patch = DealPatch {
            value: Patch::Value(dec("1000000000000000")),
            ..Default::default()
        };
        assert!(matches!(
            patch.validated(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_deal_patch_value_must_be_a_number() {
        assert!(serde_json::from_value::<DealPatch>(json!({ "value": "12.5" })).is_err());
        assert!(serde_json::from_value::<NewDeal>(json!({
            "title": "Renewal",
            "value": "12.5",
            "stage": "New Lead",
            "contact_id": 1,
            "company_id": 2
        }))
        .is_err());
        assert!(serde_json::from_slice::<DealPatch>(br#"{"value":"12.5"}"#).is_err());

        let patch: DealPatch = serde_json::from_value(json!({ "value": null })).unwrap();
        assert_eq!(patch.value, Patch::Null);
        let patch: DealPatch = serde_json::from_value(json!({})).unwrap();
        assert_eq!(patch.value, Patch::Absent);

        let patch = DealPatch {
            value: Patch::Value(dec("12.50")),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "value": 12.5 }));
    }

    #[test]
    fn test_task_patch_rejects_null_completed() {
        let patch: TaskPatch = serde_json::from_value(json!({ "completed": null })).unwrap();
        assert!(patch.validated().is_err());
    }

    #[test]
    fn test_task_patch_allows_clearing_fks() {
        let patch: TaskPatch =
            serde_json::from_value(json!({ "deal_id": null, "contact_id": 4 })).unwrap();
        let patch = patch.validated().unwrap();
        assert_eq!(patch.deal_id, Patch::Null);
        assert_eq!(patch.contact_id, Patch::Value(4));
        assert_eq!(patch.company_id, Patch::Absent);
    }
}
