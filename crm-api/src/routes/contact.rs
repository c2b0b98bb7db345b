//! Contact REST API Routes
//!
//! Contact deletes are idempotent and leave deals and tasks that reference
//! the contact untouched.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use crm_core::{Contact, ContactPatch, NewContact};
use crm_graph::{CrmService, DeleteOutcome};

use crate::{
    error::{ApiError, ApiResult},
    extract::{PathId, ValidJson},
    state::AppState,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/contacts - Create a contact
#[utoipa::path(
    post,
    path = "/api/v1/contacts",
    tag = "Contacts",
    request_body = NewContact,
    responses(
        (status = 201, description = "Contact created", body = Contact),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
)]
pub async fn create_contact(
    State(service): State<CrmService>,
    ValidJson(input): ValidJson<NewContact>,
) -> ApiResult<impl IntoResponse> {
    let contact = service.create_contact(input).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// GET /api/v1/contacts - List every contact
#[utoipa::path(
    get,
    path = "/api/v1/contacts",
    tag = "Contacts",
    responses(
        (status = 200, description = "All contacts in id order", body = [Contact]),
    ),
)]
pub async fn list_contacts(State(service): State<CrmService>) -> ApiResult<Json<Vec<Contact>>> {
    Ok(Json(service.get_contacts().await?))
}

/// GET /api/v1/contacts/{id} - Get a contact
#[utoipa::path(
    get,
    path = "/api/v1/contacts/{id}",
    tag = "Contacts",
    params(("id" = i64, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Contact details", body = Contact),
        (status = 404, description = "Contact not found", body = ApiError),
    ),
)]
pub async fn get_contact(
    State(service): State<CrmService>,
    PathId(id): PathId,
) -> ApiResult<Json<Contact>> {
    service
        .get_contact(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::entity_not_found("Contact", id))
}

/// PATCH /api/v1/contacts/{id} - Partially update a contact
#[utoipa::path(
    patch,
    path = "/api/v1/contacts/{id}",
    tag = "Contacts",
    params(("id" = i64, Path, description = "Contact ID")),
    request_body = ContactPatch,
    responses(
        (status = 200, description = "Contact updated", body = Contact),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Contact not found", body = ApiError),
    ),
)]
pub async fn update_contact(
    State(service): State<CrmService>,
    PathId(id): PathId,
    ValidJson(patch): ValidJson<ContactPatch>,
) -> ApiResult<Json<Contact>> {
    Ok(Json(service.update_contact(id, patch).await?))
}

/// DELETE /api/v1/contacts/{id} - Delete a contact
#[utoipa::path(
    delete,
    path = "/api/v1/contacts/{id}",
    tag = "Contacts",
    params(("id" = i64, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Contact deleted (or already absent)", body = DeleteOutcome),
    ),
)]
pub async fn delete_contact(
    State(service): State<CrmService>,
    PathId(id): PathId,
) -> ApiResult<Json<DeleteOutcome>> {
    Ok(Json(service.delete_contact(id).await?))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the contact routes router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts).post(create_contact))
        .route(
            "/:id",
            get(get_contact).patch(update_contact).delete(delete_contact),
        )
}
