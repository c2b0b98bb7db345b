//! Company deletion cascade.
//!
//! Removing a company removes its tasks and deals, detaches its contacts
//! and finally deletes the company row. The caller owns the transaction;
//! if any step fails nothing here is committed.

use crm_core::{CrmError, CrmResult, EntityId, EntityType, Timestamp};
use crm_storage::StoreTx;
use serde::{Deserialize, Serialize};

/// What a company deletion touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CascadeReport {
    pub tasks_deleted: u64,
    pub deals_deleted: u64,
    pub contacts_detached: u64,
}

/// Run the cascade for `company_id` inside `tx`.
///
/// Fails with `NotFound` when the company does not exist.
pub async fn delete_company<T>(
    tx: &mut T,
    company_id: EntityId,
    now: Timestamp,
) -> CrmResult<CascadeReport>
where
    T: StoreTx + ?Sized,
{
    if !tx.exists(EntityType::Company, company_id).await? {
        return Err(CrmError::not_found(EntityType::Company, company_id));
    }

    let tasks_deleted = tx.task_delete_by_company(company_id).await?;
    let deals_deleted = tx.deal_delete_by_company(company_id).await?;
    let contacts_detached = tx.contact_detach_company(company_id, now).await?;

    if !tx.company_delete(company_id).await? {
        return Err(CrmError::not_found(EntityType::Company, company_id));
    }

    Ok(CascadeReport {
        tasks_deleted,
        deals_deleted,
        contacts_detached,
    })
}
