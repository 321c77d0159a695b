//! # Engine Facade
//!
//! [`ArbiterService`] is the single entry point the hosting system calls.
//! It owns the approval queue, the audit sink, and the idempotency cache,
//! and drives the pure components:
//!
//! 1. **Admission**: cross-field shape checks; failures are audited and
//!    returned, the request is not processed.
//! 2. **Scoring**: risk and scored compliance run concurrently through the
//!    [`ScoredAdvisor`] under one deadline (`timeout_ms`). Expiry or a
//!    backend error switches the whole request to the rules-only path.
//! 3. **Combination**: the advisory pipeline merges whatever ran. Missing
//!    inputs degrade to a conservative review.
//! 4. **Escalation**: the gate decides between auto-execution and human
//!    review; review requests go to the queue with a fixed deadline.
//!
//! Every step appends to the audit sink. Audit entries are never
//! deduplicated: a replayed request gets its own `DuplicateRequest` entry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arbiter_advisory::{
    AdvisoryPipeline, AdvisoryResponse, ComplianceResponse, RiskAssessment,
};
use arbiter_core::{AdvisoryRequest, ArbiterError, ComplianceRequest, CorrelationId};
use arbiter_hil::{
    ApprovalQueue, ApprovalRequest, ApprovalResponse, AuditAction, AuditEntry, AuditSink,
    EscalationDecision, EscalationGate, HilDecisionRequest, HilMetrics, HilOutcome,
    InMemoryAuditLog, QueueError, TracingAuditSink,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::advisor::{AdvisorError, LocalScoredAdvisor, ScoredAdvisor};
use crate::config::EngineConfig;
use crate::idempotency::IdempotencyCache;

/// Errors from multi-step facade operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Arbiter(#[from] ArbiterError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Result of [`ArbiterService::advise`].
#[derive(Debug, Clone)]
pub struct Advice {
    /// The advisory response.
    pub response: AdvisoryResponse,
    /// Whether the response came from the idempotency cache.
    pub replayed: bool,
    /// Whether the escalation gate held the response for human review.
    pub requires_approval: bool,
    /// The queued review request, while the queue still holds it.
    pub approval: Option<ApprovalRequest>,
}

/// The engine facade.
pub struct ArbiterService {
    pipeline: AdvisoryPipeline,
    advisor: Arc<dyn ScoredAdvisor>,
    gate: EscalationGate,
    queue: ApprovalQueue,
    audit: Arc<dyn AuditSink>,
    cache: IdempotencyCache,
    config: EngineConfig,
    auto_executed: AtomicU64,
    fallback_count: AtomicU64,
}

impl std::fmt::Debug for ArbiterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArbiterService")
            .field("advisor", &self.advisor.name())
            .field("queue", &self.queue)
            .field("audit_entries", &self.audit.len())
            .field("cached_responses", &self.cache.len())
            .finish()
    }
}

impl ArbiterService {
    /// Build a facade over the given advisor and audit sink.
    pub fn new(
        config: EngineConfig,
        advisor: Arc<dyn ScoredAdvisor>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            pipeline: AdvisoryPipeline::new(),
            advisor,
            gate: EscalationGate::new(config.escalation, config.sla),
            queue: ApprovalQueue::new(Arc::clone(&audit)),
            audit,
            cache: IdempotencyCache::new(config.idempotency_capacity),
            config,
            auto_executed: AtomicU64::new(0),
            fallback_count: AtomicU64::new(0),
        }
    }

    /// In-process advisor with an in-memory audit log mirrored to `tracing`.
    pub fn local(config: EngineConfig) -> Self {
        Self::new(
            config,
            Arc::new(LocalScoredAdvisor::new()),
            Arc::new(TracingAuditSink::new(InMemoryAuditLog::new())),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- Advisory ------------------------------------------------------------

    /// Scored recommendation with timeout racing and rules-only fallback.
    pub async fn recommend(
        &self,
        request: &AdvisoryRequest,
        actor: &str,
    ) -> Result<AdvisoryResponse, ArbiterError> {
        self.recommend_tracked(request, actor).await.map(|(r, _)| r)
    }

    /// Rules-only recommendation. Deterministic, confidence 1.0.
    pub fn recommend_fallback(
        &self,
        request: &AdvisoryRequest,
        actor: &str,
    ) -> Result<AdvisoryResponse, ArbiterError> {
        self.admit(request, actor)?;
        self.record_requested(request, actor);
        let response = self.fall_back(request, actor, "fallback requested");
        self.record_combined(&response, actor);
        Ok(response)
    }

    /// Recommend, evaluate for human review, and queue the request when
    /// review is required. A replayed idempotency key, including one racing
    /// the original call, returns the original response and whatever review
    /// request it produced without queueing again.
    pub async fn advise(&self, request: &AdvisoryRequest, actor: &str) -> Result<Advice, ServiceError> {
        let (response, replayed) = self.recommend_tracked(request, actor).await?;
        if replayed {
            let approval = self.queue.get(&response.correlation_id);
            let requires_approval = approval.is_some()
                || matches!(
                    self.gate.evaluate(request, &response, Utc::now()),
                    EscalationDecision::RequiresApproval(_)
                );
            return Ok(Advice {
                response,
                replayed,
                requires_approval,
                approval,
            });
        }

        let approval = match self.evaluate_for_hil(request, &response, actor) {
            None => None,
            Some(decision) => {
                let id = self.submit_to_hil(decision, actor)?;
                self.queue.get(&id)
            }
        };
        Ok(Advice {
            response,
            replayed,
            requires_approval: approval.is_some(),
            approval,
        })
    }

    async fn recommend_tracked(
        &self,
        request: &AdvisoryRequest,
        actor: &str,
    ) -> Result<(AdvisoryResponse, bool), ArbiterError> {
        self.admit(request, actor)?;

        if let Some(cached) = self.cache.get(&request.idempotency_key) {
            self.record_replay(request, &cached, actor);
            return Ok((cached, true));
        }

        self.record_requested(request, actor);

        let budget = Duration::from_millis(request.timeout_ms);
        let response = match tokio::time::timeout(budget, self.score(request)).await {
            Ok(Ok((risk, compliance))) => {
                let response = self.pipeline.assemble(request, risk, compliance);
                self.record_components(&response, actor);
                response
            }
            Ok(Err(err)) => self.fall_back(request, actor, &err.to_string()),
            Err(_) => {
                let err = ArbiterError::Timeout {
                    correlation_id: request.correlation_id.to_string(),
                    timeout_ms: request.timeout_ms,
                };
                self.fall_back(request, actor, &err.to_string())
            }
        };
        self.record_combined(&response, actor);

        let (response, stored) = self.cache.insert(request.idempotency_key.clone(), response);
        if !stored {
            // A concurrent call with the same key stored first; its answer wins.
            self.record_replay(request, &response, actor);
        }
        Ok((response, !stored))
    }

    fn record_replay(&self, request: &AdvisoryRequest, cached: &AdvisoryResponse, actor: &str) {
        tracing::info!(
            correlation_id = %request.correlation_id,
            idempotency_key = %request.idempotency_key,
            "replaying cached advisory response"
        );
        self.record(
            &request.correlation_id,
            AuditAction::DuplicateRequest,
            actor,
            json!({ "idempotency_key": request.idempotency_key }),
            json!({
                "original_correlation_id": cached.correlation_id,
                "recommendation": cached.combined.recommendation.kind(),
            }),
        );
    }

    /// Run both scored calls concurrently.
    async fn score(
        &self,
        request: &AdvisoryRequest,
    ) -> Result<(Option<RiskAssessment>, Option<ComplianceResponse>), AdvisorError> {
        let payload = &request.payload;
        let risk = async {
            match &payload.risk {
                Some(input) => self.advisor.assess_risk(input).await.map(Some),
                None => Ok(None),
            }
        };
        let compliance = async {
            match &payload.compliance {
                Some(req) => self
                    .advisor
                    .check_compliance(req)
                    .await
                    .map(|scored| Some(self.pipeline.engine().settle(scored, req))),
                None => Ok(None),
            }
        };
        let (risk, compliance) = tokio::join!(risk, compliance);
        Ok((risk?, compliance?))
    }

    fn fall_back(&self, request: &AdvisoryRequest, actor: &str, reason: &str) -> AdvisoryResponse {
        tracing::warn!(
            correlation_id = %request.correlation_id,
            advisor = self.advisor.name(),
            reason,
            "using rules-only fallback"
        );
        self.fallback_count.fetch_add(1, Ordering::Relaxed);
        let response = self.pipeline.recommend_fallback(request);
        self.record(
            &request.correlation_id,
            AuditAction::FallbackUsed,
            actor,
            json!({ "reason": reason, "advisor": self.advisor.name() }),
            json!({ "recommendation": response.combined.recommendation.kind() }),
        );
        self.record_components(&response, actor);
        response
    }

    // -- Compliance ----------------------------------------------------------

    /// Scored compliance check settled against the rules strategy, under
    /// the configured default timeout.
    pub async fn check_compliance(
        &self,
        correlation_id: &CorrelationId,
        request: &ComplianceRequest,
        actor: &str,
    ) -> Result<ComplianceResponse, ArbiterError> {
        self.admit_compliance(correlation_id, request, actor)?;

        let budget = Duration::from_millis(self.config.default_timeout_ms);
        let reason = match tokio::time::timeout(budget, self.advisor.check_compliance(request)).await
        {
            Ok(Ok(scored)) => {
                let response = self.pipeline.engine().settle(scored, request);
                self.record_compliance(correlation_id, &response, actor);
                return Ok(response);
            }
            Ok(Err(err)) => err.to_string(),
            Err(_) => ArbiterError::Timeout {
                correlation_id: correlation_id.to_string(),
                timeout_ms: self.config.default_timeout_ms,
            }
            .to_string(),
        };

        tracing::warn!(
            correlation_id = %correlation_id,
            reason = %reason,
            "compliance check using rules-only fallback"
        );
        self.fallback_count.fetch_add(1, Ordering::Relaxed);
        let response = self.pipeline.engine().check_fallback(request);
        self.record(
            correlation_id,
            AuditAction::FallbackUsed,
            actor,
            json!({ "reason": reason, "advisor": self.advisor.name() }),
            json!({ "decision": response.recommendation.decision() }),
        );
        self.record_compliance(correlation_id, &response, actor);
        Ok(response)
    }

    /// Rules-only compliance check.
    pub fn check_compliance_fallback(
        &self,
        correlation_id: &CorrelationId,
        request: &ComplianceRequest,
        actor: &str,
    ) -> Result<ComplianceResponse, ArbiterError> {
        self.admit_compliance(correlation_id, request, actor)?;
        self.fallback_count.fetch_add(1, Ordering::Relaxed);
        let response = self.pipeline.engine().check_fallback(request);
        self.record(
            correlation_id,
            AuditAction::FallbackUsed,
            actor,
            json!({ "reason": "fallback requested" }),
            json!({ "decision": response.recommendation.decision() }),
        );
        self.record_compliance(correlation_id, &response, actor);
        Ok(response)
    }

    // -- Human in the loop ---------------------------------------------------

    /// Decide whether a human must review `response`. `None` means the
    /// combined recommendation can be executed directly.
    pub fn evaluate_for_hil(
        &self,
        request: &AdvisoryRequest,
        response: &AdvisoryResponse,
        actor: &str,
    ) -> Option<HilDecisionRequest> {
        match self.gate.evaluate(request, response, Utc::now()) {
            EscalationDecision::AutoExecute { recommendation } => {
                self.auto_executed.fetch_add(1, Ordering::Relaxed);
                self.record(
                    &request.correlation_id,
                    AuditAction::EscalationEvaluated,
                    actor,
                    json!({ "overall_confidence": response.combined.overall_confidence }),
                    json!({ "decision": "auto_execute" }),
                );
                self.record(
                    &request.correlation_id,
                    AuditAction::AutoExecuted,
                    actor,
                    json!({ "request_type": request.request_type }),
                    json!({ "recommendation": recommendation }),
                );
                None
            }
            EscalationDecision::RequiresApproval(decision) => {
                tracing::info!(
                    correlation_id = %request.correlation_id,
                    trigger = %decision.trigger,
                    urgency = %decision.urgency,
                    "human review required"
                );
                self.record(
                    &request.correlation_id,
                    AuditAction::EscalationEvaluated,
                    actor,
                    json!({
                        "overall_confidence": response.combined.overall_confidence,
                        "reason": decision.audit_bundle.reason,
                    }),
                    json!({
                        "decision": "requires_approval",
                        "trigger": decision.trigger,
                        "urgency": decision.urgency,
                        "sla_seconds": decision.sla_seconds,
                        "assigned_to": decision.assigned_to,
                    }),
                );
                Some(*decision)
            }
        }
    }

    /// Queue a review request. The SLA deadline is fixed now.
    pub fn submit_to_hil(
        &self,
        decision: HilDecisionRequest,
        actor: &str,
    ) -> Result<CorrelationId, QueueError> {
        self.queue.submit(decision, actor, Utc::now())
    }

    /// Apply a human response.
    pub fn process_hil_outcome(
        &self,
        correlation_id: &CorrelationId,
        response: ApprovalResponse,
    ) -> Result<HilOutcome, QueueError> {
        self.queue.resolve(correlation_id, response)
    }

    /// Queue state plus facade counters.
    pub fn get_hil_metrics(&self) -> HilMetrics {
        self.queue.metrics().with_counters(
            self.auto_executed.load(Ordering::Relaxed),
            self.fallback_count.load(Ordering::Relaxed),
        )
    }

    /// Expire pending requests whose deadline has passed.
    pub fn check_expired_requests(&self) -> Vec<CorrelationId> {
        self.check_expired_requests_at(Utc::now())
    }

    /// Expire pending requests whose deadline is before `now`.
    pub fn check_expired_requests_at(&self, now: DateTime<Utc>) -> Vec<CorrelationId> {
        let expired = self.queue.sweep_expired(now);
        if !expired.is_empty() {
            tracing::warn!(count = expired.len(), "approval requests expired");
        }
        expired
    }

    /// A queued review request.
    pub fn approval(&self, correlation_id: &CorrelationId) -> Option<ApprovalRequest> {
        self.queue.get(correlation_id)
    }

    /// Pending review requests, earliest deadline first.
    pub fn pending_approvals(&self) -> Vec<ApprovalRequest> {
        self.queue.pending()
    }

    /// Audit trail for one correlation id.
    pub fn audit_trail(&self, correlation_id: &CorrelationId) -> Vec<AuditEntry> {
        self.audit.entries_for(correlation_id)
    }

    // -- Audit helpers -------------------------------------------------------

    fn admit(&self, request: &AdvisoryRequest, actor: &str) -> Result<(), ArbiterError> {
        if let Err(err) = request.validate(self.config.max_timeout_ms) {
            tracing::warn!(
                correlation_id = %request.correlation_id,
                error = %err,
                "advisory request rejected"
            );
            self.record(
                &request.correlation_id,
                AuditAction::ValidationFailed,
                actor,
                json!({ "request_type": request.request_type }),
                json!({ "error": err.to_string() }),
            );
            return Err(err.into());
        }
        Ok(())
    }

    fn admit_compliance(
        &self,
        correlation_id: &CorrelationId,
        request: &ComplianceRequest,
        actor: &str,
    ) -> Result<(), ArbiterError> {
        if let Err(err) = request.validate() {
            tracing::warn!(correlation_id = %correlation_id, error = %err, "compliance request rejected");
            self.record(
                correlation_id,
                AuditAction::ValidationFailed,
                actor,
                json!({ "amount_tier": request.amount_tier }),
                json!({ "error": err.to_string() }),
            );
            return Err(err.into());
        }
        Ok(())
    }

    fn record_requested(&self, request: &AdvisoryRequest, actor: &str) {
        self.record(
            &request.correlation_id,
            AuditAction::AdvisoryRequested,
            actor,
            json!({
                "request_type": request.request_type,
                "priority": request.priority,
                "timeout_ms": request.timeout_ms,
                "idempotency_key": request.idempotency_key,
                "submitter": request.submitter_id.short(),
            }),
            json!({
                "risk_input": request.payload.risk.is_some(),
                "compliance_input": request.payload.compliance.is_some(),
            }),
        );
    }

    fn record_components(&self, response: &AdvisoryResponse, actor: &str) {
        if let Some(risk) = &response.risk {
            self.record(
                &response.correlation_id,
                AuditAction::RiskScored,
                actor,
                json!({ "fallback_used": response.fallback_used }),
                json!({
                    "recommendation": risk.recommendation,
                    "confidence": risk.confidence,
                    "overall_risk": response.risk_assessment.as_ref().map(|a| a.overall_risk()),
                    "risk_category": response.risk_assessment.as_ref().map(|a| a.risk_category()),
                }),
            );
        }
        if let Some(compliance) = &response.compliance {
            self.record_compliance(&response.correlation_id, compliance, actor);
        }
    }

    fn record_compliance(&self, id: &CorrelationId, response: &ComplianceResponse, actor: &str) {
        self.record(
            id,
            AuditAction::ComplianceChecked,
            actor,
            json!({
                "scored": response.scored.as_ref().map(|s| s.decision()),
                "rules": response.rules.decision(),
                "fallback_used": response.fallback_used,
            }),
            json!({
                "decision": response.recommendation.decision(),
                "overall_confidence": response.overall_confidence,
            }),
        );
        if let Some(tie) = &response.tie_breaker {
            self.record(
                id,
                AuditAction::TieBreakerApplied,
                actor,
                json!({ "conflict_reason": tie.conflict_reason }),
                json!({
                    "resolution": tie.resolution,
                    "deciding_factor": tie.deciding_factor,
                    "confidence": tie.confidence,
                }),
            );
        }
    }

    fn record_combined(&self, response: &AdvisoryResponse, actor: &str) {
        let missing = response.missing_components();
        if !missing.is_empty() {
            let err = ArbiterError::MissingAdvisoryData {
                correlation_id: response.correlation_id.to_string(),
                missing: missing.join(", "),
            };
            tracing::warn!(error = %err, "combining without full advisory data");
        }
        self.record(
            &response.correlation_id,
            AuditAction::RecommendationCombined,
            actor,
            json!({ "missing": missing, "fallback_used": response.fallback_used }),
            json!({
                "recommendation": response.combined.recommendation,
                "overall_confidence": response.combined.overall_confidence,
            }),
        );
    }

    fn record(
        &self,
        id: &CorrelationId,
        action: AuditAction,
        actor: &str,
        context: serde_json::Value,
        result: serde_json::Value,
    ) {
        self.audit
            .record(AuditEntry::new(id.clone(), action, actor, context, result));
    }
}
