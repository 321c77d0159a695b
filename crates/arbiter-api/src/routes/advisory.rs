//! # Advisory API
//!
//! `POST /v1/advisory/recommend` runs the scored path, evaluates the result
//! at the escalation gate, and queues a review request when a human must
//! decide. Replaying an idempotency key returns the original response and
//! review request without scoring or queueing again.
//!
//! `POST /v1/advisory/recommend/fallback` runs the rules-only path and
//! never queues.

use arbiter_advisory::AdvisoryResponse;
use arbiter_core::AdvisoryRequest;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::auth::{CallerIdentity, Scope};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::routes::hil::ApprovalSummary;
use crate::state::AppState;

/// What the caller should do with the recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Execute the combined recommendation.
    AutoExecute,
    /// Wait for the review request to be resolved.
    RequiresApproval,
}

/// Response of `POST /v1/advisory/recommend`.
#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub disposition: Disposition,
    /// Whether this answer was replayed from the idempotency cache.
    pub replayed: bool,
    pub advisory: AdvisoryResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalSummary>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/advisory/recommend", post(recommend))
        .route("/v1/advisory/recommend/fallback", post(recommend_fallback))
}

/// POST /v1/advisory/recommend
async fn recommend(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<AdvisoryRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, AppError> {
    state.auth.authorize(&caller, Scope::Advise)?;
    let request = extract_json(body)?;

    let advice = state.service.advise(&request, &caller.principal).await?;
    let approval = advice.approval.as_ref().map(ApprovalSummary::from);
    let disposition = if advice.requires_approval {
        Disposition::RequiresApproval
    } else {
        Disposition::AutoExecute
    };

    Ok(Json(RecommendResponse {
        disposition,
        replayed: advice.replayed,
        advisory: advice.response,
        approval,
    }))
}

/// POST /v1/advisory/recommend/fallback
async fn recommend_fallback(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<AdvisoryRequest>, JsonRejection>,
) -> Result<Json<AdvisoryResponse>, AppError> {
    state.auth.authorize(&caller, Scope::Advise)?;
    let request = extract_json(body)?;
    let response = state.service.recommend_fallback(&request, &caller.principal)?;
    Ok(Json(response))
}
