//! CRM Core - Entity Types
//!
//! Data structures shared by every other crate: the four record kinds,
//! the deal stage enum, tri-state patches, command inputs with their
//! boundary checks, and the error taxonomy. No storage or I/O lives here.

pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod input;
pub mod money;
pub mod patch;
pub mod validation;

pub use entities::{Company, Contact, Deal, Record, Task};
pub use enums::{DealStage, DealStageParseError, EntityType};
pub use error::{CrmError, CrmResult, ReferenceError, StorageError, ValidationError};
pub use identity::{next_write_time, now, EntityId, Timestamp};
pub use input::{
    normalize_money, CompanyPatch, ContactPatch, DealPatch, NewCompany, NewContact, NewDeal,
    NewTask, TaskPatch, MONEY_SCALE,
};
pub use patch::Patch;
pub use validation::HasUpdates;

pub use rust_decimal::Decimal;
