//! Error types for CRM operations

use crate::{EntityId, EntityType};
use thiserror::Error;

/// Input validation errors, raised before anything touches the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Field {field} cannot be null")]
    NullNotAllowed { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid format for {field}: expected {expected}")]
    InvalidFormat { field: String, expected: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::RequiredFieldMissing { field }
            | ValidationError::NullNotAllowed { field }
            | ValidationError::InvalidValue { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

/// A foreign key names a record that does not exist.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Referenced {entity_type} with id {id} does not exist (field {field})")]
pub struct ReferenceError {
    pub entity_type: EntityType,
    pub id: EntityId,
    pub field: &'static str,
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Insert failed for {entity_type}: {reason}")]
    InsertFailed {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Update failed for {entity_type} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: EntityId,
        reason: String,
    },

    #[error("Delete failed for {entity_type}: {reason}")]
    DeleteFailed {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Corrupt row in {entity_type}: {reason}")]
    CorruptRow {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Storage backend unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Master error type for all CRM errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrmError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("{entity_type} with id {id} not found")]
    NotFound {
        entity_type: EntityType,
        id: EntityId,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CrmError {
    pub fn not_found(entity_type: EntityType, id: EntityId) -> Self {
        CrmError::NotFound { entity_type, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CrmError::NotFound { .. })
    }
}

/// Result type alias for CRM operations.
pub type CrmResult<T> = Result<T, CrmError>;

// =============================================================================
// TESTS
// =============================================================================
