//! Task REST API Routes

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use crm_core::{NewTask, Task, TaskPatch};
use crm_graph::{CrmService, DeleteOutcome};

use crate::{
    error::{ApiError, ApiResult},
    extract::{PathId, ValidJson},
    state::AppState,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/tasks - Create a task
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    tag = "Tasks",
    request_body = NewTask,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
)]
pub async fn create_task(
    State(service): State<CrmService>,
    ValidJson(input): ValidJson<NewTask>,
) -> ApiResult<impl IntoResponse> {
    let task = service.create_task(input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/v1/tasks - List every task
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    tag = "Tasks",
    responses(
        (status = 200, description = "All tasks in id order", body = [Task]),
    ),
)]
pub async fn list_tasks(State(service): State<CrmService>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(service.get_tasks().await?))
}

/// GET /api/v1/tasks/{id} - Get a task
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task details", body = Task),
        (status = 404, description = "Task not found", body = ApiError),
    ),
)]
pub async fn get_task(
    State(service): State<CrmService>,
    PathId(id): PathId,
) -> ApiResult<Json<Task>> {
    service
        .get_task(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::entity_not_found("Task", id))
}

/// PATCH /api/v1/tasks/{id} - Partially update a task
#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task ID")),
    request_body = TaskPatch,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
    ),
)]
pub async fn update_task(
    State(service): State<CrmService>,
    PathId(id): PathId,
    ValidJson(patch): ValidJson<TaskPatch>,
) -> ApiResult<Json<Task>> {
    Ok(Json(service.update_task(id, patch).await?))
}

/// DELETE /api/v1/tasks/{id} - Delete a task
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted (or already absent)", body = DeleteOutcome),
    ),
)]
pub async fn delete_task(
    State(service): State<CrmService>,
    PathId(id): PathId,
) -> ApiResult<Json<DeleteOutcome>> {
    Ok(Json(service.delete_task(id).await?))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the task routes router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route(
            "/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
}
