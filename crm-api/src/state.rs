//! Shared application state for Axum routers.

use std::time::Instant;

use axum::extract::FromRef;
use crm_graph::CrmService;

/// Application-wide state shared across all routes.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Mutation policy over the configured store.
    pub service: CrmService,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: CrmService) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }
}

impl FromRef<AppState> for CrmService {
    fn from_ref(state: &AppState) -> Self {
        state.service.clone()
    }
}

impl FromRef<AppState> for Instant {
    fn from_ref(state: &AppState) -> Self {
        state.start_time
    }
}
