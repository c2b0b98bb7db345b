//! CRM Storage - Store Traits and In-Memory Implementation
//!
//! Defines the transactional storage abstraction for CRM entities.
//! Every command runs inside one [`StoreTx`]; nothing it writes is visible
//! to other commands until [`StoreTx::commit`] succeeds. The Postgres
//! implementation lives in crm-api.

pub mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use crm_core::{
    Company, Contact, CrmResult, Deal, EntityId, EntityType, NewCompany, NewContact, NewDeal,
    NewTask, StorageError, Task, Timestamp,
};
use std::fmt;

// ============================================================================
// STORE TRAITS
// ============================================================================

/// Entry point to a store: hands out units of work.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Open a transaction.
    async fn begin(&self) -> CrmResult<Box<dyn StoreTx>>;

    /// Cheap reachability probe for readiness checks.
    async fn ping(&self) -> CrmResult<()>;
}

/// A single unit of work against the store.
///
/// Reads observe the transaction's own writes. Dropping a transaction
/// without calling [`StoreTx::commit`] discards its writes.
#[async_trait]
pub trait StoreTx: Send {
    // === Company Operations ===

    /// Insert a company, assigning its id and both timestamps.
    async fn company_insert(&mut self, input: &NewCompany, now: Timestamp) -> CrmResult<Company>;

    /// Get a company by ID.
    async fn company_get(&mut self, id: EntityId) -> CrmResult<Option<Company>>;

    /// List all companies in id order.
    async fn company_list(&mut self) -> CrmResult<Vec<Company>>;

    /// Overwrite a stored company. Fails with `NotFound` if it is gone.
    async fn company_save(&mut self, company: &Company) -> CrmResult<()>;

    /// Delete a company row. Returns whether a row was removed.
    async fn company_delete(&mut self, id: EntityId) -> CrmResult<bool>;

    // === Contact Operations ===

    async fn contact_insert(&mut self, input: &NewContact, now: Timestamp) -> CrmResult<Contact>;
    async fn contact_get(&mut self, id: EntityId) -> CrmResult<Option<Contact>>;
    async fn contact_list(&mut self) -> CrmResult<Vec<Contact>>;
    async fn contact_save(&mut self, contact: &Contact) -> CrmResult<()>;
    async fn contact_delete(&mut self, id: EntityId) -> CrmResult<bool>;

    // === Deal Operations ===

    async fn deal_insert(&mut self, input: &NewDeal, now: Timestamp) -> CrmResult<Deal>;
    async fn deal_get(&mut self, id: EntityId) -> CrmResult<Option<Deal>>;
    async fn deal_list(&mut self) -> CrmResult<Vec<Deal>>;
    async fn deal_save(&mut self, deal: &Deal) -> CrmResult<()>;
    async fn deal_delete(&mut self, id: EntityId) -> CrmResult<bool>;

    // === Task Operations ===

    async fn task_insert(&mut self, input: &NewTask, now: Timestamp) -> CrmResult<Task>;
    async fn task_get(&mut self, id: EntityId) -> CrmResult<Option<Task>>;
    async fn task_list(&mut self) -> CrmResult<Vec<Task>>;
    async fn task_save(&mut self, task: &Task) -> CrmResult<()>;
    async fn task_delete(&mut self, id: EntityId) -> CrmResult<bool>;

    // === Graph Operations ===

    /// Whether a record of `kind` with `id` exists.
    ///
    /// Implementations that support it keep the row from being deleted by
    /// other transactions until this one finishes.
    async fn exists(&mut self, kind: EntityType, id: EntityId) -> CrmResult<bool>;

    /// Delete every task whose company_id is `company_id`, or whose deal
    /// belongs to that company.
    async fn task_delete_by_company(&mut self, company_id: EntityId) -> CrmResult<u64>;

    /// Delete every deal whose company_id is `company_id`.
    async fn deal_delete_by_company(&mut self, company_id: EntityId) -> CrmResult<u64>;

    /// Null out company_id on every contact referencing `company_id`,
    /// advancing their updated_at.
    async fn contact_detach_company(
        &mut self,
        company_id: EntityId,
        now: Timestamp,
    ) -> CrmResult<u64>;

    // === Lifecycle ===

    /// Make every write of this transaction visible.
    async fn commit(self: Box<Self>) -> CrmResult<()>;

    /// Discard every write of this transaction.
    async fn rollback(self: Box<Self>) -> CrmResult<()>;
}

// ============================================================================
// FAULT INJECTION
// ============================================================================

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Insert(EntityType),
    Save(EntityType),
    Delete(EntityType),
    DeleteTasksByCompany,
    DeleteDealsByCompany,
    DetachContacts,
    Commit,
}

impl StoreOp {
    /// The error a faulted operation reports.
    pub fn fault(&self) -> StorageError {
        let reason = format!("injected fault on {}", self);
        match self {
            StoreOp::Insert(kind) => StorageError::InsertFailed {
                entity_type: *kind,
                reason,
            },
            StoreOp::Save(kind) => StorageError::UpdateFailed {
                entity_type: *kind,
                id: 0,
                reason,
            },
            StoreOp::Delete(kind) => StorageError::DeleteFailed {
                entity_type: *kind,
                reason,
            },
            StoreOp::DeleteTasksByCompany => StorageError::DeleteFailed {
                entity_type: EntityType::Task,
                reason,
            },
            StoreOp::DeleteDealsByCompany => StorageError::DeleteFailed {
                entity_type: EntityType::Deal,
                reason,
            },
            StoreOp::DetachContacts => StorageError::UpdateFailed {
                entity_type: EntityType::Contact,
                id: 0,
                reason,
            },
            StoreOp::Commit => StorageError::TransactionFailed { reason },
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::Insert(kind) => write!(f, "{} insert", kind),
            StoreOp::Save(kind) => write!(f, "{} save", kind),
            StoreOp::Delete(kind) => write!(f, "{} delete", kind),
            StoreOp::DeleteTasksByCompany => f.write_str("task delete by company"),
            StoreOp::DeleteDealsByCompany => f.write_str("deal delete by company"),
            StoreOp::DetachContacts => f.write_str("contact detach"),
            StoreOp::Commit => f.write_str("commit"),
        }
    }
}
