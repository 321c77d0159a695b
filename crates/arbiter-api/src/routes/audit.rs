//! # Audit API
//!
//! Read-only view of the audit trail for one correlation id, each entry
//! with its SHA-256 content digest.

use arbiter_core::CorrelationId;
use arbiter_hil::AuditEntry;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::auth::{CallerIdentity, Scope};
use crate::error::AppError;
use crate::extractors::correlation_id;
use crate::state::AppState;

/// One audit entry with its digest.
#[derive(Debug, Serialize)]
pub struct AuditRecord {
    #[serde(flatten)]
    pub entry: AuditEntry,
    pub digest: Option<String>,
}

/// Response of `GET /v1/audit/:correlation_id`.
#[derive(Debug, Serialize)]
pub struct AuditTrailResponse {
    pub correlation_id: CorrelationId,
    pub entries: Vec<AuditRecord>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/audit/:correlation_id", get(trail))
}

/// GET /v1/audit/:correlation_id: 404 when nothing was recorded.
async fn trail(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(raw): Path<String>,
) -> Result<Json<AuditTrailResponse>, AppError> {
    state.auth.authorize(&caller, Scope::Advise)?;
    let id = correlation_id(&raw)?;
    let entries = state.service.audit_trail(&id);
    if entries.is_empty() {
        return Err(AppError::NotFound(format!("no audit entries for {id}")));
    }
    let entries = entries
        .into_iter()
        .map(|entry| AuditRecord {
            digest: entry.digest(),
            entry,
        })
        .collect();
    Ok(Json(AuditTrailResponse {
        correlation_id: id,
        entries,
    }))
}
