//! CRM API Server Entry Point
//!
//! Loads configuration, opens the store and starts the Axum HTTP server.

use axum::Router;
use crm_api::telemetry::{init_tracing, LogFormat};
use crm_api::{app_state, connect_store, create_api_router, ApiConfig, ApiError, ApiResult};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(LogFormat::from_env())?;

    let config = ApiConfig::from_env();
    let store = connect_store(&config).await?;

    let app: Router = create_api_router(app_state(store), &config);

    let addr = config.bind_addr()?;
    tracing::info!(%addr, store = ?config.store, "Starting CRM API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
