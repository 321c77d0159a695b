//! # Human-in-the-Loop API
//!
//! Review requests are created by the advisory endpoint; this module reads,
//! resolves, and sweeps them. Resolution stamps the response with the
//! server clock, and the SLA is judged against that stamp.

use arbiter_advisory::EscalationTarget;
use arbiter_core::{CorrelationId, Priority};
use arbiter_hil::{
    ApprovalAction, ApprovalRequest, ApprovalResponse, ApprovalStatus, EscalationTrigger,
    HilMetrics, HilOutcome,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{CallerIdentity, Scope};
use crate::error::AppError;
use crate::extractors::{correlation_id, extract_validated_json, Validate};
use crate::state::AppState;

/// Longest accepted reasoning text.
const MAX_REASONING_LEN: usize = 4_096;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Compact view of a queued review request.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalSummary {
    pub correlation_id: CorrelationId,
    pub status: ApprovalStatus,
    pub trigger: EscalationTrigger,
    pub urgency: Priority,
    pub assigned_to: EscalationTarget,
    pub escalation_level: u32,
    pub submitted_at: DateTime<Utc>,
    pub sla_expires_at: DateTime<Utc>,
    /// Detail of the trigger that fired.
    pub reason: String,
}

impl From<&ApprovalRequest> for ApprovalSummary {
    fn from(r: &ApprovalRequest) -> Self {
        Self {
            correlation_id: r.correlation_id().clone(),
            status: r.status(),
            trigger: r.trigger(),
            urgency: r.priority(),
            assigned_to: r.assigned_to(),
            escalation_level: r.escalation_level(),
            submitted_at: r.submitted_at(),
            sla_expires_at: r.sla_expires_at(),
            reason: r.audit_bundle().reason.clone(),
        }
    }
}

/// Body of `POST /v1/hil/requests/:id/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub action: ApprovalAction,
    /// Defaults to the caller's principal. Only admins may name someone else.
    #[serde(default)]
    pub approver: Option<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl Validate for ResolveRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(approver) = &self.approver {
            if approver.trim().is_empty() {
                return Err("approver must not be empty".to_string());
            }
        }
        if self.reasoning.len() > MAX_REASONING_LEN {
            return Err(format!(
                "reasoning must not exceed {MAX_REASONING_LEN} characters"
            ));
        }
        match &self.action {
            ApprovalAction::Escalate { reason, .. } if reason.trim().is_empty() => {
                Err("escalate requires a reason".to_string())
            }
            ApprovalAction::RequestMoreInfo { questions } if questions.is_empty() => {
                Err("request_more_info requires at least one question".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Response of `POST /v1/hil/sweep`.
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub expired: Vec<CorrelationId>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/hil/requests", get(list_pending))
        .route("/v1/hil/requests/:id", get(get_request))
        .route("/v1/hil/requests/:id/resolve", post(resolve))
        .route("/v1/hil/sweep", post(sweep))
        .route("/v1/hil/metrics", get(metrics))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /v1/hil/requests: pending requests, earliest deadline first.
async fn list_pending(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<ApprovalSummary>>, AppError> {
    state.auth.authorize(&caller, Scope::Advise)?;
    let pending = state.service.pending_approvals();
    Ok(Json(pending.iter().map(ApprovalSummary::from).collect()))
}

/// GET /v1/hil/requests/:id: full request including the audit bundle.
async fn get_request(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<ApprovalRequest>, AppError> {
    state.auth.authorize(&caller, Scope::Advise)?;
    let id = correlation_id(&id)?;
    state
        .service
        .approval(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("approval request {id}")))
}

/// POST /v1/hil/requests/:id/resolve
async fn resolve(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<HilOutcome>, AppError> {
    state.auth.authorize(&caller, Scope::Resolve)?;
    let id = correlation_id(&id)?;
    let req = extract_validated_json(body)?;

    let approver = req.approver.unwrap_or_else(|| caller.principal.clone());
    if !caller.may_act_as(&approver) {
        return Err(AppError::Forbidden(format!(
            "principal '{}' cannot resolve as '{approver}'",
            caller.principal
        )));
    }

    let response = ApprovalResponse::new(req.action, approver, req.reasoning);
    let outcome = state.service.process_hil_outcome(&id, response)?;
    Ok(Json(outcome))
}

/// POST /v1/hil/sweep: expire overdue requests now.
async fn sweep(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<SweepResponse>, AppError> {
    state.auth.authorize(&caller, Scope::Operate)?;
    Ok(Json(SweepResponse {
        expired: state.service.check_expired_requests(),
    }))
}

/// GET /v1/hil/metrics
async fn metrics(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<HilMetrics>, AppError> {
    state.auth.authorize(&caller, Scope::Advise)?;
    Ok(Json(state.service.get_hil_metrics()))
}
