//! OpenAPI Specification for the CRM API
//!
//! Generated with utoipa from the route annotations and the schema derives
//! on the core types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{
    ComponentHealth, HealthDetails, HealthResponse, HealthStatus, PingResponse,
};
use crate::routes::{company, contact, deal, health, task};

use crm_core::{
    Company, CompanyPatch, Contact, ContactPatch, Deal, DealPatch, DealStage, NewCompany,
    NewContact, NewDeal, NewTask, Task, TaskPatch,
};
use crm_graph::{CascadeReport, DeleteOutcome};

/// OpenAPI document for the CRM API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "CRM API",
        version = "0.1.0",
        description = "Companies, contacts, deals and tasks with referential validation, partial updates and cascading company deletes",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:2022", description = "Local Development")
    ),
    tags(
        (name = "Companies", description = "Organisations; deleting one cascades to its deals and tasks"),
        (name = "Contacts", description = "People, optionally attached to a company"),
        (name = "Deals", description = "Sales opportunities and their pipeline stage"),
        (name = "Tasks", description = "To-do items linked to any other record"),
        (name = "Health", description = "Liveness and readiness")
    ),
    paths(
        company::create_company,
        company::list_companies,
        company::get_company,
        company::update_company,
        company::delete_company,
        contact::create_contact,
        contact::list_contacts,
        contact::get_contact,
        contact::update_contact,
        contact::delete_contact,
        deal::create_deal,
        deal::list_deals,
        deal::get_deal,
        deal::update_deal,
        deal::delete_deal,
        task::create_task,
        task::list_tasks,
        task::get_task,
        task::update_task,
        task::delete_task,
        health::ping,
        health::readiness,
    ),
    components(schemas(
        Company,
        Contact,
        Deal,
        Task,
        DealStage,
        NewCompany,
        NewContact,
        NewDeal,
        NewTask,
        CompanyPatch,
        ContactPatch,
        DealPatch,
        TaskPatch,
        DeleteOutcome,
        CascadeReport,
        ApiError,
        ErrorCode,
        PingResponse,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_entity_path() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/companies",
            "/api/v1/companies/{id}",
            "/api/v1/contacts",
            "/api/v1/deals/{id}",
            "/api/v1/tasks",
            "/health/ping",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_document_serializes() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("DeleteOutcome"));
        assert!(json.contains("INVALID_REFERENCE"));
    }
}
