//! API Configuration Module
//!
//! Settings for the listener, CORS, request concurrency and the storage
//! backend. Values are loaded from environment variables with development
//! defaults.

use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};

/// Port used when neither `PORT` nor `CRM_API_PORT` is set.
pub const DEFAULT_PORT: u16 = 2022;

// ============================================================================
// STORE BACKEND
// ============================================================================

/// Which [`crm_storage::EntityStore`] the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Process-local store; state is lost on restart.
    Memory,
    /// PostgreSQL via deadpool.
    #[default]
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "mem" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for the listener, CORS, concurrency and storage.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // Listener
    // ========================================================================
    /// Interface to bind.
    pub bind_host: String,

    /// TCP port to listen on.
    pub port: u16,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    /// Example: "https://crm.example.com,https://admin.example.com"
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Server Configuration
    // ========================================================================
    /// Upper bound on requests handled at once.
    pub max_concurrent_requests: usize,

    /// Storage backend selection.
    pub store: StoreBackend,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: 86400, // 24 hours
            max_concurrent_requests: 512,
            store: StoreBackend::default(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CRM_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` or `CRM_API_PORT`: Listen port (default: 2022)
    /// - `CRM_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `CRM_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `CRM_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `CRM_MAX_CONCURRENT_REQUESTS`: In-flight request cap (default: 512)
    /// - `CRM_STORE`: "postgres" or "memory" (default: postgres)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_host = std::env::var("CRM_API_BIND").unwrap_or(defaults.bind_host);

        let port = match std::env::var("PORT").or_else(|_| std::env::var("CRM_API_PORT")) {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid port, using default");
                defaults.port
            }),
            Err(_) => defaults.port,
        };

        let cors_origins = std::env::var("CRM_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("CRM_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(defaults.cors_allow_credentials);

        let cors_max_age_secs = std::env::var("CRM_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let max_concurrent_requests = std::env::var("CRM_MAX_CONCURRENT_REQUESTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_concurrent_requests);

        let store = match std::env::var("CRM_STORE") {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "falling back to default store backend");
                defaults.store
            }),
            Err(_) => defaults.store,
        };

        Self {
            bind_host,
            port,
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            max_concurrent_requests,
            store,
        }
    }

    /// Socket address the server listens on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            // Dev mode: allow all
            return true;
        }
        self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
