//! CRM Test Utilities
//!
//! Shared test infrastructure for the CRM workspace:
//! - Proptest generators for commands and patches
//! - Fixtures for the canonical company/contact/deal/task graph
//! - Assertions on the error taxonomy

// Re-export the in-memory store from its source crate
pub use crm_storage::{EntityStore, InMemoryStore, StoreOp, StoreTx};

// Re-export core types for convenience
pub use crm_core::{
    now, Company, CompanyPatch, Contact, ContactPatch, CrmError, CrmResult, Deal, DealPatch,
    DealStage, Decimal, EntityId, EntityType, NewCompany, NewContact, NewDeal, NewTask, Patch,
    ReferenceError, StorageError, Task, TaskPatch, Timestamp, ValidationError,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for CRM commands.

    use super::*;
    use proptest::prelude::*;

    /// Generate a positive entity id.
    pub fn arb_entity_id() -> impl Strategy<Value = EntityId> {
        1i64..1_000_000
    }

    /// Generate a Timestamp between 2020 and 2030, whole seconds.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(now)
        })
    }

    /// Generate a DealStage variant.
    pub fn arb_deal_stage() -> impl Strategy<Value = DealStage> {
        prop::sample::select(DealStage::ALL.to_vec())
    }

    /// Generate a non-blank display name.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,12}( [A-Z][a-z]{1,12})?"
    }

    /// Generate a well-formed email address.
    pub fn arb_email() -> impl Strategy<Value = String> {
        "[a-z]{1,10}(\\.[a-z]{1,6})?@[a-z]{2,10}\\.(com|org|io|dev)"
    }

    /// Generate a non-negative amount with two decimal places, up to the
    /// NUMERIC(15,2) range.
    pub fn arb_money() -> impl Strategy<Value = Decimal> {
        (0i64..=999_999_999_999_99).prop_map(|cents| Decimal::new(cents, 2))
    }

    /// Generate an optional free-text field.
    pub fn arb_optional_text() -> impl Strategy<Value = Option<String>> {
        prop::option::of("[A-Za-z0-9 ]{1,24}")
    }

    /// Generate a patch for a nullable text field.
    pub fn arb_text_patch() -> impl Strategy<Value = Patch<String>> {
        prop_oneof![
            Just(Patch::Absent),
            Just(Patch::Null),
            "[A-Za-z0-9 ]{1,24}".prop_map(Patch::Value),
        ]
    }

    /// Generate a valid NewCompany.
    pub fn arb_new_company() -> impl Strategy<Value = NewCompany> {
        (
            arb_name(),
            arb_optional_text(),
            arb_optional_text(),
            prop::option::of(arb_email()),
        )
            .prop_map(|(name, industry, address, email)| NewCompany {
                name,
                industry,
                website: None,
                phone: None,
                email,
                address,
            })
    }

    /// Generate a valid NewContact attached to `company_id`.
    pub fn arb_new_contact(company_id: Option<EntityId>) -> impl Strategy<Value = NewContact> {
        (
            arb_name(),
            arb_name(),
            prop::option::of(arb_email()),
            arb_optional_text(),
        )
            .prop_map(move |(first_name, last_name, email, job_title)| NewContact {
                first_name,
                last_name,
                email,
                phone: None,
                job_title,
                company_id,
            })
    }

    /// Generate a valid NewDeal between existing records.
    pub fn arb_new_deal(
        contact_id: EntityId,
        company_id: EntityId,
    ) -> impl Strategy<Value = NewDeal> {
        (arb_name(), arb_money(), arb_deal_stage(), arb_optional_text()).prop_map(
            move |(title, value, stage, description)| NewDeal {
                title,
                description,
                value,
                stage,
                contact_id,
                company_id,
                expected_close_date: None,
            },
        )
    }

    /// Generate a CompanyPatch that never touches the required name.
    pub fn arb_company_patch() -> impl Strategy<Value = CompanyPatch> {
        (
            arb_text_patch(),
            arb_text_patch(),
            arb_text_patch(),
            arb_text_patch(),
        )
            .prop_map(|(industry, website, phone, address)| CompanyPatch {
                name: Patch::Absent,
                industry,
                website,
                phone,
                email: Patch::Absent,
                address,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common scenarios.

    use super::*;

    /// A company with every optional field filled.
    pub fn acme() -> NewCompany {
        NewCompany {
            name: "Acme".to_string(),
            industry: Some("Tech".to_string()),
            website: Some("https://acme.example".to_string()),
            phone: Some("+1 555 0100".to_string()),
            email: Some("info@acme.com".to_string()),
            address: Some("1 Main St".to_string()),
        }
    }

    /// A contact working at `company_id`.
    pub fn ada(company_id: Option<EntityId>) -> NewContact {
        NewContact {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Some("ada@acme.com".to_string()),
            phone: None,
            job_title: Some("Engineer".to_string()),
            company_id,
        }
    }

    /// A deal worth 999999.99.
    pub fn big_deal(contact_id: EntityId, company_id: EntityId) -> NewDeal {
        NewDeal {
            title: "Enterprise licence".to_string(),
            description: Some("Three-year term".to_string()),
            value: Decimal::new(99_999_999, 2),
            stage: DealStage::ProposalSent,
            contact_id,
            company_id,
            expected_close_date: None,
        }
    }

    /// A task linked to every kind.
    pub fn follow_up(
        contact_id: Option<EntityId>,
        company_id: Option<EntityId>,
        deal_id: Option<EntityId>,
    ) -> NewTask {
        NewTask {
            title: "Follow up".to_string(),
            description: None,
            completed: false,
            due_date: None,
            contact_id,
            company_id,
            deal_id,
        }
    }

    /// A task reachable from its company only through `deal_id`.
    pub fn deal_review(deal_id: EntityId) -> NewTask {
        NewTask {
            title: "Review terms".to_string(),
            ..follow_up(None, None, Some(deal_id))
        }
    }

    /// One record of each kind, linked together.
    #[derive(Debug, Clone)]
    pub struct Graph {
        pub company: Company,
        pub contact: Contact,
        pub deal: Deal,
        pub task: Task,
    }

    /// Commit Company C, Contact A (at C), Deal D (A at C) and Task T
    /// (A, C and D) in one transaction.
    pub async fn seed_graph(store: &dyn EntityStore) -> CrmResult<Graph> {
        let ts = now();
        let mut tx = store.begin().await?;
        let company = tx.company_insert(&acme(), ts).await?;
        let contact = tx.contact_insert(&ada(Some(company.id)), ts).await?;
        let deal = tx
            .deal_insert(&big_deal(contact.id, company.id), ts)
            .await?;
        let task = tx
            .task_insert(
                &follow_up(Some(contact.id), Some(company.id), Some(deal.id)),
                ts,
            )
            .await?;
        tx.commit().await?;
        Ok(Graph {
            company,
            contact,
            deal,
            task,
        })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on the CRM error taxonomy.

    use super::*;

    /// Assert that a CrmResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &CrmResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a CrmResult is a validation error on `field`.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &CrmResult<T>, field: &str) {
        match result {
            Err(CrmError::Validation(err)) => {
                assert_eq!(err.field(), field, "Wrong field in ValidationError");
            }
            other => panic!("Expected Validation error on {}, got: {:?}", field, other),
        }
    }

    /// Assert that a CrmResult is a reference error naming `entity_type` and `id`.
    #[track_caller]
    pub fn assert_reference_error<T: std::fmt::Debug>(
        result: &CrmResult<T>,
        entity_type: EntityType,
        id: EntityId,
    ) {
        match result {
            Err(CrmError::Reference(err)) => {
                assert_eq!(err.entity_type, entity_type, "Wrong kind in ReferenceError");
                assert_eq!(err.id, id, "Wrong id in ReferenceError");
            }
            other => panic!(
                "Expected Reference error for {} {}, got: {:?}",
                entity_type, id, other
            ),
        }
    }

    /// Assert that a CrmResult is a NotFound error for `entity_type`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &CrmResult<T>, entity_type: EntityType) {
        match result {
            Err(CrmError::NotFound {
                entity_type: et, ..
            }) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Assert that a CrmResult is a storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &CrmResult<T>) {
        match result {
            Err(CrmError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }
}
