//! Referential validation.
//!
//! Every command that carries foreign keys lists them through
//! [`References`]. Before any write, each listed key is checked against
//! the store inside the command's transaction.

use crm_core::{
    ContactPatch, CrmResult, DealPatch, EntityId, EntityType, NewContact, NewDeal, NewTask,
    ReferenceError, TaskPatch,
};
use crm_storage::StoreTx;

/// A foreign key carried by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub field: &'static str,
    pub target: EntityType,
    pub id: EntityId,
}

impl ForeignKey {
    pub fn new(field: &'static str, target: EntityType, id: EntityId) -> Self {
        Self { field, target, id }
    }
}

/// Commands that name other records.
///
/// Only keys that are present and non-null are listed; absent patch fields
/// and explicit nulls need no target.
pub trait References {
    fn references(&self) -> Vec<ForeignKey>;
}

impl References for NewContact {
    fn references(&self) -> Vec<ForeignKey> {
        self.company_id
            .map(|id| ForeignKey::new("company_id", EntityType::Company, id))
            .into_iter()
            .collect()
    }
}

impl References for ContactPatch {
    fn references(&self) -> Vec<ForeignKey> {
        self.company_id
            .value()
            .map(|id| ForeignKey::new("company_id", EntityType::Company, *id))
            .into_iter()
            .collect()
    }
}

impl References for NewDeal {
    fn references(&self) -> Vec<ForeignKey> {
        vec![
            ForeignKey::new("contact_id", EntityType::Contact, self.contact_id),
            ForeignKey::new("company_id", EntityType::Company, self.company_id),
        ]
    }
}

impl References for DealPatch {
    fn references(&self) -> Vec<ForeignKey> {
        [
            self.contact_id
                .value()
                .map(|id| ForeignKey::new("contact_id", EntityType::Contact, *id)),
            self.company_id
                .value()
                .map(|id| ForeignKey::new("company_id", EntityType::Company, *id)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl References for NewTask {
    fn references(&self) -> Vec<ForeignKey> {
        [
            self.contact_id
                .map(|id| ForeignKey::new("contact_id", EntityType::Contact, id)),
            self.company_id
                .map(|id| ForeignKey::new("company_id", EntityType::Company, id)),
            self.deal_id
                .map(|id| ForeignKey::new("deal_id", EntityType::Deal, id)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl References for TaskPatch {
    fn references(&self) -> Vec<ForeignKey> {
        [
            self.contact_id
                .value()
                .map(|id| ForeignKey::new("contact_id", EntityType::Contact, *id)),
            self.company_id
                .value()
                .map(|id| ForeignKey::new("company_id", EntityType::Company, *id)),
            self.deal_id
                .value()
                .map(|id| ForeignKey::new("deal_id", EntityType::Deal, *id)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Check that every foreign key of `command` names an existing record.
///
/// Fails with the first missing target, in field order.
pub async fn validate_references<T, C>(tx: &mut T, command: &C) -> CrmResult<()>
where
    T: StoreTx + ?Sized,
    C: References + Sync + ?Sized,
{
    for key in command.references() {
        if !tx.exists(key.target, key.id).await? {
            tracing::warn!(
                field = key.field,
                target = %key.target,
                id = key.id,
                "rejected reference to missing record"
            );
            return Err(ReferenceError {
                entity_type: key.target,
                id: key.id,
                field: key.field,
            }
            .into());
        }
    }
    Ok(())
}
