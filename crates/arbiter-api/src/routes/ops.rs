//! # Operations API
//!
//! HTTP traffic counters for operators.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::{CallerIdentity, Scope};
use crate::error::AppError;
use crate::middleware::metrics::ApiMetricsSnapshot;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/metrics/http", get(http_metrics))
}

/// GET /v1/metrics/http
async fn http_metrics(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<ApiMetricsSnapshot>, AppError> {
    state.auth.authorize(&caller, Scope::Operate)?;
    Ok(Json(state.http_metrics.snapshot()))
}
