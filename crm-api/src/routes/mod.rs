//! REST API Routes Module
//!
//! Route handlers organized by entity type, plus health checks and the
//! OpenAPI document. Every entity route lives under `/api/v1`.

pub mod company;
pub mod contact;
pub mod deal;
pub mod health;
pub mod task;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::openapi::ApiDoc;
use crate::state::AppState;

pub use company::create_router as company_router;
pub use contact::create_router as contact_router;
pub use deal::create_router as deal_router;
pub use health::create_router as health_router;
pub use task::create_router as task_router;

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// ROUTER
// ============================================================================

/// Entity CRUD routes, to be nested under `/api/v1`.
fn entity_routes() -> Router<AppState> {
    Router::new()
        .nest("/companies", company_router())
        .nest("/contacts", contact_router())
        .nest("/deals", deal_router())
        .nest("/tasks", task_router())
}

/// Create the complete API router.
///
/// - Entity routes under /api/v1/{companies,contacts,deals,tasks}
/// - Health checks at /health/*
/// - OpenAPI spec at /openapi.json
/// - Swagger UI at /swagger-ui (when the swagger-ui feature is enabled)
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    let mut router = Router::new()
        .nest("/api/v1", entity_routes())
        .nest("/health", health_router())
        .route("/openapi.json", get(openapi_json))
        .with_state(state);

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()));
    }

    // Execution order: CORS -> Trace -> Concurrency limit -> Handler
    router
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// Empty origins allow every origin (development). Otherwise only the
/// configured origins are allowed.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: development mode - allowing all origins");
        return cors.allow_origin(Any);
    }

    tracing::info!(origins = ?config.cors_origins, "CORS: restricted origins");
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if config.cors_allow_credentials {
        cors.allow_origin(origins).allow_credentials(true)
    } else {
        cors.allow_origin(origins)
    }
}
