//! Deal REST API Routes
//!
//! `value` travels as a JSON number with two decimal places. Any stage may
//! follow any other.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use crm_core::{Deal, DealPatch, NewDeal};
use crm_graph::{CrmService, DeleteOutcome};

use crate::{
    error::{ApiError, ApiResult},
    extract::{PathId, ValidJson},
    state::AppState,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/deals - Create a deal
#[utoipa::path(
    post,
    path = "/api/v1/deals",
    tag = "Deals",
    request_body = NewDeal,
    responses(
        (status = 201, description = "Deal created", body = Deal),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
)]
pub async fn create_deal(
    State(service): State<CrmService>,
    ValidJson(input): ValidJson<NewDeal>,
) -> ApiResult<impl IntoResponse> {
    let deal = service.create_deal(input).await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

/// GET /api/v1/deals - List every deal
#[utoipa::path(
    get,
    path = "/api/v1/deals",
    tag = "Deals",
    responses(
        (status = 200, description = "All deals in id order", body = [Deal]),
    ),
)]
pub async fn list_deals(State(service): State<CrmService>) -> ApiResult<Json<Vec<Deal>>> {
    Ok(Json(service.get_deals().await?))
}

/// GET /api/v1/deals/{id} - Get a deal
#[utoipa::path(
    get,
    path = "/api/v1/deals/{id}",
    tag = "Deals",
    params(("id" = i64, Path, description = "Deal ID")),
    responses(
        (status = 200, description = "Deal details", body = Deal),
        (status = 404, description = "Deal not found", body = ApiError),
    ),
)]
pub async fn get_deal(
    State(service): State<CrmService>,
    PathId(id): PathId,
) -> ApiResult<Json<Deal>> {
    service
        .get_deal(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::entity_not_found("Deal", id))
}

/// PATCH /api/v1/deals/{id} - Partially update a deal
#[utoipa::path(
    patch,
    path = "/api/v1/deals/{id}",
    tag = "Deals",
    params(("id" = i64, Path, description = "Deal ID")),
    request_body = DealPatch,
    responses(
        (status = 200, description = "Deal updated", body = Deal),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Deal not found", body = ApiError),
    ),
)]
pub async fn update_deal(
    State(service): State<CrmService>,
    PathId(id): PathId,
    ValidJson(patch): ValidJson<DealPatch>,
) -> ApiResult<Json<Deal>> {
    Ok(Json(service.update_deal(id, patch).await?))
}

/// DELETE /api/v1/deals/{id} - Delete a deal
#[utoipa::path(
    delete,
    path = "/api/v1/deals/{id}",
    tag = "Deals",
    params(("id" = i64, Path, description = "Deal ID")),
    responses(
        (status = 200, description = "Deal deleted (or already absent)", body = DeleteOutcome),
    ),
)]
pub async fn delete_deal(
    State(service): State<CrmService>,
    PathId(id): PathId,
) -> ApiResult<Json<DeleteOutcome>> {
    Ok(Json(service.delete_deal(id).await?))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the deal routes router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deals).post(create_deal))
        .route(
            "/:id",
            get(get_deal).patch(update_deal).delete(delete_deal),
        )
}
