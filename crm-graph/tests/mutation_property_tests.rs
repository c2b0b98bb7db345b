//! Property tests for partial updates and the company cascade.

use std::sync::Arc;

use crm_graph::CrmService;
use crm_test_utils::fixtures::{ada, big_deal, follow_up};
use crm_test_utils::generators::*;
use crm_test_utils::*;
use proptest::prelude::*;
use tokio::runtime::Runtime;

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn expected_after(current: &Option<String>, patch: &Patch<String>) -> Option<String> {
    match patch {
        Patch::Absent => current.clone(),
        Patch::Null => None,
        Patch::Value(v) => Some(v.clone()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every nullable field follows its tri-state independently; the
    /// required name is untouched when absent.
    #[test]
    fn prop_company_patch_applies_field_by_field(
        input in arb_new_company(),
        patch in arb_company_patch(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = InMemoryStore::new();
            let svc = CrmService::new(Arc::new(store));

            let created = svc.create_company(input).await.unwrap();
            let updated = svc.update_company(created.id, patch.clone()).await.unwrap();

            prop_assert_eq!(&updated.name, &created.name);
            prop_assert_eq!(&updated.email, &created.email);
            prop_assert_eq!(updated.industry, expected_after(&created.industry, &patch.industry));
            prop_assert_eq!(updated.website, expected_after(&created.website, &patch.website));
            prop_assert_eq!(updated.phone, expected_after(&created.phone, &patch.phone));
            prop_assert_eq!(updated.address, expected_after(&created.address, &patch.address));
            prop_assert_eq!(updated.created_at, created.created_at);
            prop_assert!(updated.updated_at > created.updated_at);
            Ok(())
        })?;
    }

    /// Any stored amount is read back unchanged.
    #[test]
    fn prop_deal_value_is_preserved(value in arb_money(), stage in arb_deal_stage()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = InMemoryStore::new();
            let svc = CrmService::new(Arc::new(store));

            let company = svc.create_company(NewCompany::new("Acme")).await.unwrap();
            let contact = svc.create_contact(ada(Some(company.id))).await.unwrap();
            let mut input = big_deal(contact.id, company.id);
            input.value = value;
            input.stage = stage;

            let created = svc.create_deal(input).await.unwrap();
            let fetched = svc.get_deal(created.id).await.unwrap().unwrap();
            prop_assert_eq!(fetched.value, value);
            prop_assert_eq!(fetched.stage, stage);
            Ok(())
        })?;
    }

    /// Deleting a company removes exactly its tasks and deals and detaches
    /// exactly its contacts; the other company's records are untouched.
    #[test]
    fn prop_cascade_is_complete_and_contained(
        contacts in 0usize..4,
        deals in 0usize..4,
        tasks in 0usize..4,
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = InMemoryStore::new();
            let svc = CrmService::new(Arc::new(store.clone()));

            let target = svc.create_company(NewCompany::new("Target")).await.unwrap();
            let bystander = svc.create_company(NewCompany::new("Bystander")).await.unwrap();
            let anchor = svc.create_contact(ada(Some(bystander.id))).await.unwrap();
            svc.create_deal(big_deal(anchor.id, bystander.id)).await.unwrap();
            svc.create_task(follow_up(None, Some(bystander.id), None)).await.unwrap();

            for _ in 0..contacts {
                svc.create_contact(ada(Some(target.id))).await.unwrap();
            }
            for _ in 0..deals {
                svc.create_deal(big_deal(anchor.id, target.id)).await.unwrap();
            }
            for _ in 0..tasks {
                svc.create_task(follow_up(Some(anchor.id), Some(target.id), None)).await.unwrap();
            }

            let outcome = svc.delete_company(target.id).await.unwrap();
            let report = outcome.cascade.unwrap();
            prop_assert_eq!(report.contacts_detached, contacts as u64);
            prop_assert_eq!(report.deals_deleted, deals as u64);
            prop_assert_eq!(report.tasks_deleted, tasks as u64);

            prop_assert_eq!(store.count(EntityType::Company).await, 1);
            prop_assert_eq!(store.count(EntityType::Contact).await, contacts + 1);
            prop_assert_eq!(store.count(EntityType::Deal).await, 1);
            prop_assert_eq!(store.count(EntityType::Task).await, 1);

            let remaining = svc.get_contacts().await.unwrap();
            prop_assert!(remaining.iter().all(|c| c.company_id != Some(target.id)));
            prop_assert_eq!(
                svc.get_contact(anchor.id).await.unwrap().map(|c| c.company_id),
                Some(Some(bystander.id))
            );
            Ok(())
        })?;
    }
}
