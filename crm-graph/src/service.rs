//! CRM Service
//!
//! The command/query boundary over an [`EntityStore`]. Each command runs
//! in exactly one store transaction: boundary validation, reference
//! checks, patch resolution and writes either all commit or all roll back.

use std::sync::Arc;

use crm_core::{
    now, Company, CompanyPatch, Contact, ContactPatch, CrmError, CrmResult, Deal, DealPatch,
    EntityId, EntityType, HasUpdates, NewCompany, NewContact, NewDeal, NewTask, Task, TaskPatch,
};
use crm_storage::{EntityStore, StoreTx};
use serde::{Deserialize, Serialize};

use crate::cascade::{self, CascadeReport};
use crate::references::validate_references;
use crate::resolver::Resolve;

/// Result of a delete command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeleteOutcome {
    pub success: bool,
    /// Whether a row was actually removed. False for a repeated delete.
    pub removed: bool,
    /// Present for company deletions only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cascade: Option<CascadeReport>,
}

impl DeleteOutcome {
    fn plain(removed: bool) -> Self {
        Self {
            success: true,
            removed,
            cascade: None,
        }
    }

    fn cascaded(report: CascadeReport) -> Self {
        Self {
            success: true,
            removed: true,
            cascade: Some(report),
        }
    }
}

/// Commit on success, roll back on failure, and hand back the command result.
async fn finish<T>(tx: Box<dyn StoreTx>, result: CrmResult<T>) -> CrmResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            if matches!(err, CrmError::Storage(_)) {
                tracing::error!(error = %err, "storage failure, command rolled back");
            }
            Err(err)
        }
    }
}

/// Command/query service for the four entity kinds.
#[derive(Clone)]
pub struct CrmService {
    store: Arc<dyn EntityStore>,
}

impl std::fmt::Debug for CrmService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmService").finish_non_exhaustive()
    }
}

impl CrmService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Whether the backing store answers.
    pub async fn ping(&self) -> CrmResult<()> {
        self.store.ping().await
    }

    // ========================================================================
    // COMPANIES
    // ========================================================================

    #[tracing::instrument(skip(self, input))]
    pub async fn create_company(&self, input: NewCompany) -> CrmResult<Company> {
        let input = input.validated()?;
        let mut tx = self.store.begin().await?;
        let result = tx.company_insert(&input, now()).await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_company(&self, id: EntityId) -> CrmResult<Option<Company>> {
        let mut tx = self.store.begin().await?;
        let result = tx.company_get(id).await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_companies(&self) -> CrmResult<Vec<Company>> {
        let mut tx = self.store.begin().await?;
        let result = tx.company_list().await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_company(&self, id: EntityId, patch: CompanyPatch) -> CrmResult<Company> {
        let patch = patch.validated()?;
        if !patch.has_any_updates() {
            tracing::debug!("empty patch, only updated_at changes");
        }
        let mut tx = self.store.begin().await?;
        let result: CrmResult<Company> = async {
            let existing = tx
                .company_get(id)
                .await?
                .ok_or_else(|| CrmError::not_found(EntityType::Company, id))?;
            let updated = existing.resolve(patch, now())?;
            tx.company_save(&updated).await?;
            Ok(updated)
        }
        .await;
        finish(tx, result).await
    }

    /// Delete a company and everything that hangs off it.
    ///
    /// Unlike the other kinds, a missing company is an error.
    #[tracing::instrument(skip(self))]
    pub async fn delete_company(&self, id: EntityId) -> CrmResult<DeleteOutcome> {
        let mut tx = self.store.begin().await?;
        let result = cascade::delete_company(&mut *tx, id, now()).await;
        let report = finish(tx, result).await?;
        tracing::info!(
            company_id = id,
            tasks_deleted = report.tasks_deleted,
            deals_deleted = report.deals_deleted,
            contacts_detached = report.contacts_detached,
            "company deleted"
        );
        Ok(DeleteOutcome::cascaded(report))
    }

    // ========================================================================
    // CONTACTS
    // ========================================================================

    #[tracing::instrument(skip(self, input))]
    pub async fn create_contact(&self, input: NewContact) -> CrmResult<Contact> {
        let input = input.validated()?;
        let mut tx = self.store.begin().await?;
        let result: CrmResult<Contact> = async {
            validate_references(&mut *tx, &input).await?;
            tx.contact_insert(&input, now()).await
        }
        .await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_contact(&self, id: EntityId) -> CrmResult<Option<Contact>> {
        let mut tx = self.store.begin().await?;
        let result = tx.contact_get(id).await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_contacts(&self) -> CrmResult<Vec<Contact>> {
        let mut tx = self.store.begin().await?;
        let result = tx.contact_list().await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_contact(&self, id: EntityId, patch: ContactPatch) -> CrmResult<Contact> {
        let patch = patch.validated()?;
        if !patch.has_any_updates() {
            tracing::debug!("empty patch, only updated_at changes");
        }
        let mut tx = self.store.begin().await?;
        let result: CrmResult<Contact> = async {
            let existing = tx
                .contact_get(id)
                .await?
                .ok_or_else(|| CrmError::not_found(EntityType::Contact, id))?;
            validate_references(&mut *tx, &patch).await?;
            let updated = existing.resolve(patch, now())?;
            tx.contact_save(&updated).await?;
            Ok(updated)
        }
        .await;
        finish(tx, result).await
    }

    /// Delete a contact. Deals and tasks pointing at it are left alone.
    #[tracing::instrument(skip(self))]
    pub async fn delete_contact(&self, id: EntityId) -> CrmResult<DeleteOutcome> {
        let mut tx = self.store.begin().await?;
        let result = tx.contact_delete(id).await;
        let removed = finish(tx, result).await?;
        tracing::info!(contact_id = id, removed, "contact deleted");
        Ok(DeleteOutcome::plain(removed))
    }

    // ========================================================================
    // DEALS
    // ========================================================================

    #[tracing::instrument(skip(self, input))]
    pub async fn create_deal(&self, input: NewDeal) -> CrmResult<Deal> {
        let input = input.validated()?;
        let mut tx = self.store.begin().await?;
        let result: CrmResult<Deal> = async {
            validate_references(&mut *tx, &input).await?;
            tx.deal_insert(&input, now()).await
        }
        .await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_deal(&self, id: EntityId) -> CrmResult<Option<Deal>> {
        let mut tx = self.store.begin().await?;
        let result = tx.deal_get(id).await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_deals(&self) -> CrmResult<Vec<Deal>> {
        let mut tx = self.store.begin().await?;
        let result = tx.deal_list().await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_deal(&self, id: EntityId, patch: DealPatch) -> CrmResult<Deal> {
        let patch = patch.validated()?;
        if !patch.has_any_updates() {
            tracing::debug!("empty patch, only updated_at changes");
        }
        let mut tx = self.store.begin().await?;
        let result: CrmResult<Deal> = async {
            let existing = tx
                .deal_get(id)
                .await?
                .ok_or_else(|| CrmError::not_found(EntityType::Deal, id))?;
            validate_references(&mut *tx, &patch).await?;
            let updated = existing.resolve(patch, now())?;
            tx.deal_save(&updated).await?;
            Ok(updated)
        }
        .await;
        finish(tx, result).await
    }

    /// Delete a deal. Tasks pointing at it are left alone.
    #[tracing::instrument(skip(self))]
    pub async fn delete_deal(&self, id: EntityId) -> CrmResult<DeleteOutcome> {
        let mut tx = self.store.begin().await?;
        let result = tx.deal_delete(id).await;
        let removed = finish(tx, result).await?;
        tracing::info!(deal_id = id, removed, "deal deleted");
        Ok(DeleteOutcome::plain(removed))
    }

    // ========================================================================
    // TASKS
    // ========================================================================

    #[tracing::instrument(skip(self, input))]
    pub async fn create_task(&self, input: NewTask) -> CrmResult<Task> {
        let input = input.validated()?;
        let mut tx = self.store.begin().await?;
        let result: CrmResult<Task> = async {
            validate_references(&mut *tx, &input).await?;
            tx.task_insert(&input, now()).await
        }
        .await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_task(&self, id: EntityId) -> CrmResult<Option<Task>> {
        let mut tx = self.store.begin().await?;
        let result = tx.task_get(id).await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_tasks(&self) -> CrmResult<Vec<Task>> {
        let mut tx = self.store.begin().await?;
        let result = tx.task_list().await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_task(&self, id: EntityId, patch: TaskPatch) -> CrmResult<Task> {
        let patch = patch.validated()?;
        if !patch.has_any_updates() {
            tracing::debug!("empty patch, only updated_at changes");
        }
        let mut tx = self.store.begin().await?;
        let result: CrmResult<Task> = async {
            let existing = tx
                .task_get(id)
                .await?
                .ok_or_else(|| CrmError::not_found(EntityType::Task, id))?;
            validate_references(&mut *tx, &patch).await?;
            let updated = existing.resolve(patch, now())?;
            tx.task_save(&updated).await?;
            Ok(updated)
        }
        .await;
        finish(tx, result).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: EntityId) -> CrmResult<DeleteOutcome> {
        let mut tx = self.store.begin().await?;
        let result = tx.task_delete(id).await;
        let removed = finish(tx, result).await?;
        tracing::info!(task_id = id, removed, "task deleted");
        Ok(DeleteOutcome::plain(removed))
    }
}
