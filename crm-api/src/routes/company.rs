//! Company REST API Routes
//!
//! Deleting a company cascades: its tasks and deals are deleted and its
//! contacts are detached, all in one transaction.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use crm_core::{Company, CompanyPatch, NewCompany};
use crm_graph::{CrmService, DeleteOutcome};

use crate::{
    error::{ApiError, ApiResult},
    extract::{PathId, ValidJson},
    state::AppState,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/companies - Create a company
#[utoipa::path(
    post,
    path = "/api/v1/companies",
    tag = "Companies",
    request_body = NewCompany,
    responses(
        (status = 201, description = "Company created", body = Company),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
)]
pub async fn create_company(
    State(service): State<CrmService>,
    ValidJson(input): ValidJson<NewCompany>,
) -> ApiResult<impl IntoResponse> {
    let company = service.create_company(input).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /api/v1/companies - List every company
#[utoipa::path(
    get,
    path = "/api/v1/companies",
    tag = "Companies",
    responses(
        (status = 200, description = "All companies in id order", body = [Company]),
    ),
)]
pub async fn list_companies(State(service): State<CrmService>) -> ApiResult<Json<Vec<Company>>> {
    Ok(Json(service.get_companies().await?))
}

/// GET /api/v1/companies/{id} - Get a company
#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}",
    tag = "Companies",
    params(("id" = i64, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company details", body = Company),
        (status = 404, description = "Company not found", body = ApiError),
    ),
)]
pub async fn get_company(
    State(service): State<CrmService>,
    PathId(id): PathId,
) -> ApiResult<Json<Company>> {
    service
        .get_company(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::entity_not_found("Company", id))
}

/// PATCH /api/v1/companies/{id} - Partially update a company
#[utoipa::path(
    patch,
    path = "/api/v1/companies/{id}",
    tag = "Companies",
    params(("id" = i64, Path, description = "Company ID")),
    request_body = CompanyPatch,
    responses(
        (status = 200, description = "Company updated", body = Company),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Company not found", body = ApiError),
    ),
)]
pub async fn update_company(
    State(service): State<CrmService>,
    PathId(id): PathId,
    ValidJson(patch): ValidJson<CompanyPatch>,
) -> ApiResult<Json<Company>> {
    Ok(Json(service.update_company(id, patch).await?))
}

/// DELETE /api/v1/companies/{id} - Delete a company and cascade
#[utoipa::path(
    delete,
    path = "/api/v1/companies/{id}",
    tag = "Companies",
    params(("id" = i64, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company deleted, with cascade counts", body = DeleteOutcome),
        (status = 404, description = "Company not found", body = ApiError),
    ),
)]
pub async fn delete_company(
    State(service): State<CrmService>,
    PathId(id): PathId,
) -> ApiResult<Json<DeleteOutcome>> {
    Ok(Json(service.delete_company(id).await?))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the company routes router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_companies).post(create_company))
        .route(
            "/:id",
            get(get_company).patch(update_company).delete(delete_company),
        )
}
