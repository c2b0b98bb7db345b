//! Core entity structures

use crate::{DealStage, EntityId, EntityType, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Common surface of every stored record.
pub trait Record: Clone + Send + Sync + 'static {
    const ENTITY_TYPE: EntityType;

    fn id(&self) -> EntityId;
    fn created_at(&self) -> Timestamp;
    fn updated_at(&self) -> Timestamp;
}

/// Company - an organisation the CRM tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Company {
    pub id: EntityId,
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// Contact - a person, optionally attached to a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Contact {
    pub id: EntityId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company_id: Option<EntityId>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Deal - a sales opportunity with a contact at a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Deal {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    /// Monetary value, two decimal places, serialized as a JSON number.
    #[serde(with = "crate::money")]
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub value: Decimal,
    pub stage: DealStage,
    pub contact_id: EntityId,
    pub company_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub expected_close_date: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// Task - a to-do item, optionally linked to a contact, company and deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub due_date: Option<Timestamp>,
    pub contact_id: Option<EntityId>,
    pub company_id: Option<EntityId>,
    pub deal_id: Option<EntityId>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

macro_rules! impl_record {
    ($type:ty, $kind:expr) => {
        impl Record for $type {
            const ENTITY_TYPE: EntityType = $kind;

            fn id(&self) -> EntityId {
                self.id
            }

            fn created_at(&self) -> Timestamp {
                self.created_at
            }

            fn updated_at(&self) -> Timestamp {
                self.updated_at
            }
        }
    };
}

impl_record!(Company, EntityType::Company);
impl_record!(Contact, EntityType::Contact);
impl_record!(Deal, EntityType::Deal);
impl_record!(Task, EntityType::Task);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::now;
    use serde_json::json;
    use std::str::FromStr;

    fn sample_deal(value: &str) -> Deal {
        let ts = now();
        Deal {
            id: 7,
            title: "Enterprise licence".to_string(),
            description: None,
            value: Decimal::from_str(value).unwrap(),
            stage: DealStage::Won,
            contact_id: 1,
            company_id: 2,
            expected_close_date: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_deal_value_serializes_as_number() {
        let json = serde_json::to_value(sample_deal("999999.99")).unwrap();
        assert_eq!(json["value"], json!(999999.99));
        assert_eq!(json["stage"], json!("Won"));
    }

    #[test]
    fn test_deal_value_roundtrips_exactly() {
        let deal = sample_deal("999999.99");
        let text = serde_json::to_string(&deal).unwrap();
        let back: Deal = serde_json::from_str(&text).unwrap();
        assert_eq!(back.value, Decimal::from_str("999999.99").unwrap());
        assert_eq!(back, deal);
    }

    #[test]
    fn test_record_trait() {
        let deal = sample_deal("10.00");
        assert_eq!(Record::id(&deal), 7);
        assert_eq!(<Deal as Record>::ENTITY_TYPE, EntityType::Deal);
    }

    #[test]
    fn test_contact_full_name() {
        let ts = now();
        let contact = Contact {
            id: 1,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            phone: None,
            job_title: None,
            company_id: None,
            created_at: ts,
            updated_at: ts,
        };
        assert_eq!(contact.full_name(), "Ada Lovelace");
    }
}
