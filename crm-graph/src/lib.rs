//! CRM Graph - Mutation Policy
//!
//! Business rules for mutating the entity graph: referential validation,
//! partial-update resolution and the company deletion cascade, exposed
//! through [`CrmService`].

pub mod cascade;
pub mod references;
pub mod resolver;
pub mod service;

pub use cascade::CascadeReport;
pub use references::{validate_references, ForeignKey, References};
pub use resolver::Resolve;
pub use service::{CrmService, DeleteOutcome};
