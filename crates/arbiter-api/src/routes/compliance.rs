//! # Compliance API
//!
//! Standalone compliance checks, outside a full advisory request. Both
//! endpoints accept an optional correlation id so the check can join an
//! existing audit trail; one is generated otherwise.

use arbiter_advisory::ComplianceResponse;
use arbiter_core::{ComplianceRequest, CorrelationId};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::{CallerIdentity, Scope};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Body of the compliance endpoints.
#[derive(Debug, Deserialize)]
pub struct ComplianceCheckRequest {
    #[serde(default)]
    pub correlation_id: Option<CorrelationId>,
    pub request: ComplianceRequest,
}

/// Response of the compliance endpoints.
#[derive(Debug, Serialize)]
pub struct ComplianceCheckResponse {
    pub correlation_id: CorrelationId,
    pub result: ComplianceResponse,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/compliance/check", post(check))
        .route("/v1/compliance/check/fallback", post(check_fallback))
}

/// POST /v1/compliance/check
async fn check(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ComplianceCheckRequest>, JsonRejection>,
) -> Result<Json<ComplianceCheckResponse>, AppError> {
    state.auth.authorize(&caller, Scope::Advise)?;
    let body = extract_json(body)?;
    let correlation_id = body.correlation_id.unwrap_or_else(CorrelationId::generate);
    let result = state
        .service
        .check_compliance(&correlation_id, &body.request, &caller.principal)
        .await?;
    Ok(Json(ComplianceCheckResponse {
        correlation_id,
        result,
    }))
}

/// POST /v1/compliance/check/fallback
async fn check_fallback(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ComplianceCheckRequest>, JsonRejection>,
) -> Result<Json<ComplianceCheckResponse>, AppError> {
    state.auth.authorize(&caller, Scope::Advise)?;
    let body = extract_json(body)?;
    let correlation_id = body.correlation_id.unwrap_or_else(CorrelationId::generate);
    let result = state
        .service
        .check_compliance_fallback(&correlation_id, &body.request, &caller.principal)?;
    Ok(Json(ComplianceCheckResponse {
        correlation_id,
        result,
    }))
}
