//! # arbiter-api: Engine Facade and HTTP Service
//!
//! Hosts the arbitration engine behind an Axum application. The
//! [`service::ArbiterService`] facade owns the advisory pipeline, the
//! escalation gate, the approval queue, and the audit sink; route handlers
//! only authorize, extract, and delegate.
//!
//! ## Routes
//!
//! | Method | Path                                  | Scope   |
//! |--------|---------------------------------------|---------|
//! | POST   | `/v1/advisory/recommend`              | advise  |
//! | POST   | `/v1/advisory/recommend/fallback`     | advise  |
//! | POST   | `/v1/compliance/check`                | advise  |
//! | POST   | `/v1/compliance/check/fallback`       | advise  |
//! | GET    | `/v1/hil/requests`                    | advise  |
//! | GET    | `/v1/hil/requests/:id`                | advise  |
//! | POST   | `/v1/hil/requests/:id/resolve`        | resolve |
//! | POST   | `/v1/hil/sweep`                       | operate |
//! | GET    | `/v1/hil/metrics`                     | advise  |
//! | GET    | `/v1/audit/:correlation_id`           | advise  |
//! | GET    | `/v1/metrics/http`                    | operate |
//! | GET    | `/health/liveness`, `/health/readiness` | none  |
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler

pub mod advisor;
pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod idempotency;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod state;
pub mod sweeper;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Assemble the application router.
///
/// Health probes are mounted outside the auth middleware so they remain
/// reachable without credentials.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::advisory::router())
        .merge(routes::compliance::router())
        .merge(routes::hil::router())
        .merge(routes::audit::router())
        .merge(routes::ops::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(state.auth.clone()))
        .layer(axum::Extension(state.http_metrics.clone()))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// GET /health/liveness
async fn liveness() -> &'static str {
    "ok"
}

/// GET /health/readiness
async fn readiness() -> &'static str {
    "ready"
}
