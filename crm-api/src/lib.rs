//! CRM API - REST Layer
//!
//! Axum server over [`crm_graph::CrmService`]. Storage is either the
//! PostgreSQL-backed [`PgStore`] or the in-memory store from crm-storage.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use crm_graph::CrmService;
use crm_storage::{EntityStore, InMemoryStore};

// Re-export commonly used types
pub use config::{ApiConfig, StoreBackend};
pub use db::{DbConfig, PgStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;

/// Open the store selected by `config`, applying the schema for Postgres.
pub async fn connect_store(config: &ApiConfig) -> ApiResult<Arc<dyn EntityStore>> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let store = PgStore::from_config(&DbConfig::from_env())?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
    }
}

/// Build application state over a store.
pub fn app_state(store: Arc<dyn EntityStore>) -> AppState {
    AppState::new(CrmService::new(store))
}
