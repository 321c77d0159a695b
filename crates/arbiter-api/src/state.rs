//! # Application State
//!
//! Shared state handed to every handler via the `State` extractor. The
//! engine facade is constructed once at startup and shared behind an `Arc`;
//! nothing here is a process-wide singleton.

use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::service::ArbiterService;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The engine facade.
    pub service: Arc<ArbiterService>,
    /// Session validation.
    pub auth: AuthConfig,
    /// HTTP traffic counters.
    pub http_metrics: ApiMetrics,
    /// Configuration the state was built from.
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// In-process engine configured from `config`.
    pub fn new(config: AppConfig) -> Self {
        let service = Arc::new(ArbiterService::local(config.engine.clone()));
        Self::with_service(config, service)
    }

    /// State around an existing facade, e.g. one with a remote advisor.
    pub fn with_service(config: AppConfig, service: Arc<ArbiterService>) -> Self {
        Self {
            auth: AuthConfig::from_token(config.auth_token.as_deref()),
            service,
            http_metrics: ApiMetrics::new(),
            config: Arc::new(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
