//! # Approval Queue
//!
//! The only shared mutable state in the engine: pending human-review
//! requests keyed by correlation id.
//!
//! ## Concurrency
//!
//! Backed by a sharded [`DashMap`], so `submit` and `resolve` serialize per
//! key while unrelated ids proceed in parallel. The SLA deadline is fixed
//! inside `submit` under the entry lock and never recomputed.
//!
//! [`ApprovalQueue::sweep_expired`] is best-effort: it collects candidates
//! under shard read locks, then uses `try_get_mut` and skips any entry a
//! concurrent `resolve` currently holds. A resolve racing a sweep always wins.
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──resolve──▶ Resolved
//!    │
//!    └──sweep──▶ Expired ──resolve (late)──▶ Resolved
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use arbiter_advisory::EscalationTarget;
use arbiter_core::{ArbiterError, BusinessImpact, CorrelationId, Priority, RequestType};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::try_result::TryResult;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::error::QueueError;
use crate::escalation::{
    ApprovalResponse, AuditBundle, EscalationGate, EscalationTrigger, HilDecisionRequest,
    HilOutcome,
};
use crate::metrics::{HilMetrics, MetricsAccumulator};

const SWEEPER: &str = "sla_sweeper";

// ---------------------------------------------------------------------------
// ApprovalStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a queued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for a human.
    Pending,
    /// A human responded.
    Resolved,
    /// The SLA passed without a response. Still accepts a late response.
    Expired,
}

impl ApprovalStatus {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Expired => "expired",
        }
    }

    /// No further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ApprovalRequest
// ---------------------------------------------------------------------------

/// A request under human review.
///
/// Fields are read-only outside this crate; status transitions happen only
/// through [`ApprovalQueue`]. `sla_expires_at` is always
/// `submitted_at + sla_seconds`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalRequest {
    correlation_id: CorrelationId,
    request_type: RequestType,
    priority: Priority,
    trigger: EscalationTrigger,
    business_impact: BusinessImpact,
    submitted_at: DateTime<Utc>,
    sla_expires_at: DateTime<Utc>,
    sla_seconds: i64,
    audit_bundle: AuditBundle,
    status: ApprovalStatus,
    assigned_to: EscalationTarget,
    escalation_level: u32,
    metadata: BTreeMap<String, String>,
    outcome: Option<HilOutcome>,
}

impl ApprovalRequest {
    pub(crate) fn pending(decision: HilDecisionRequest, now: DateTime<Utc>) -> Self {
        Self {
            correlation_id: decision.correlation_id,
            request_type: decision.request_type,
            priority: decision.urgency,
            trigger: decision.trigger,
            business_impact: decision.business_impact,
            submitted_at: now,
            sla_expires_at: now + TimeDelta::seconds(decision.sla_seconds),
            sla_seconds: decision.sla_seconds,
            audit_bundle: decision.audit_bundle,
            status: ApprovalStatus::Pending,
            assigned_to: decision.assigned_to,
            escalation_level: 0,
            metadata: decision.metadata,
            outcome: None,
        }
    }

    /// Correlation id.
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Kind of action under review.
    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Review urgency.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Trigger that raised the request.
    pub fn trigger(&self) -> EscalationTrigger {
        self.trigger
    }

    /// Business impact.
    pub fn business_impact(&self) -> BusinessImpact {
        self.business_impact
    }

    /// When the queue accepted the request.
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// SLA deadline.
    pub fn sla_expires_at(&self) -> DateTime<Utc> {
        self.sla_expires_at
    }

    /// SLA window in seconds.
    pub fn sla_seconds(&self) -> i64 {
        self.sla_seconds
    }

    /// Inputs and intermediate decisions.
    pub fn audit_bundle(&self) -> &AuditBundle {
        &self.audit_bundle
    }

    /// Current status.
    pub fn status(&self) -> ApprovalStatus {
        self.status
    }

    /// Current reviewer.
    pub fn assigned_to(&self) -> EscalationTarget {
        self.assigned_to
    }

    /// Number of times the request was escalated by expiry.
    pub fn escalation_level(&self) -> u32 {
        self.escalation_level
    }

    /// Flat key/value context.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Outcome, once resolved.
    pub fn outcome(&self) -> Option<&HilOutcome> {
        self.outcome.as_ref()
    }

    /// Whether the deadline has passed at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now > self.sla_expires_at
    }
}

/// Next reviewer up when a request expires unanswered.
fn escalate_assignment(target: EscalationTarget) -> EscalationTarget {
    match target {
        EscalationTarget::Supervisor => EscalationTarget::Management,
        EscalationTarget::Management | EscalationTarget::Compliance | EscalationTarget::Legal => {
            EscalationTarget::Legal
        }
    }
}

// ---------------------------------------------------------------------------
// ApprovalQueue
// ---------------------------------------------------------------------------

/// Store of human-review requests.
pub struct ApprovalQueue {
    requests: DashMap<CorrelationId, ApprovalRequest>,
    audit: Arc<dyn AuditSink>,
}

impl ApprovalQueue {
    /// Create an empty queue that records to `audit`.
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            requests: DashMap::new(),
            audit,
        }
    }

    /// Accept a request and fix its SLA deadline at `now`.
    pub fn submit(
        &self,
        decision: HilDecisionRequest,
        submitted_by: &str,
        now: DateTime<Utc>,
    ) -> Result<CorrelationId, QueueError> {
        if decision.sla_seconds <= 0 {
            return Err(QueueError::InconsistentDeadline {
                correlation_id: decision.correlation_id.to_string(),
                sla_seconds: decision.sla_seconds,
            });
        }
        let id = decision.correlation_id.clone();
        let (deadline, urgency, trigger) = match self.requests.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(QueueError::DuplicateSubmission {
                    correlation_id: id.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                let request = ApprovalRequest::pending(decision, now);
                let summary = (request.sla_expires_at, request.priority, request.trigger);
                slot.insert(request);
                summary
            }
        };

        tracing::info!(
            correlation_id = %id,
            trigger = %trigger,
            urgency = %urgency,
            sla_expires_at = %deadline.to_rfc3339(),
            "approval request submitted"
        );
        self.audit.record(AuditEntry::new(
            id.clone(),
            AuditAction::ApprovalSubmitted,
            submitted_by,
            serde_json::json!({ "trigger": trigger, "urgency": urgency }),
            serde_json::json!({ "submitted_at": now, "sla_expires_at": deadline }),
        ));
        Ok(id)
    }

    /// Apply a human response. Expired requests still accept a late
    /// response, recorded as an SLA violation.
    pub fn resolve(
        &self,
        id: &CorrelationId,
        response: ApprovalResponse,
    ) -> Result<HilOutcome, QueueError> {
        let (outcome, was_expired, deadline) = {
            let mut slot = self
                .requests
                .get_mut(id)
                .ok_or_else(|| QueueError::NotFound {
                    correlation_id: id.to_string(),
                })?;
            if slot.status.is_terminal() {
                let resolved_at = slot
                    .outcome
                    .as_ref()
                    .map(|o| o.resolved_at.to_rfc3339())
                    .unwrap_or_default();
                return Err(QueueError::AlreadyResolved {
                    correlation_id: id.to_string(),
                    resolved_at,
                });
            }
            let outcome = EscalationGate::outcome(&slot, &response);
            let was_expired = slot.status == ApprovalStatus::Expired;
            slot.status = ApprovalStatus::Resolved;
            slot.outcome = Some(outcome.clone());
            (outcome, was_expired, slot.sla_expires_at)
        };

        tracing::info!(
            correlation_id = %id,
            action = response.action.kind(),
            approver = %response.approver,
            sla_compliant = outcome.sla_compliant,
            "approval request resolved"
        );
        self.audit.record(AuditEntry::new(
            id.clone(),
            AuditAction::ApprovalResolved,
            response.approver.clone(),
            serde_json::json!({
                "action": response.action,
                "reasoning": response.reasoning,
                "was_expired": was_expired,
            }),
            serde_json::json!({
                "final_recommendation": outcome.final_recommendation,
                "sla_compliant": outcome.sla_compliant,
            }),
        ));
        if !outcome.sla_compliant {
            let violation = ArbiterError::SlaViolation {
                correlation_id: id.to_string(),
                expired_at: deadline.to_rfc3339(),
                resolved_at: outcome.resolved_at.to_rfc3339(),
            };
            tracing::warn!(correlation_id = %id, error = %violation, "late human response");
            self.audit.record(AuditEntry::new(
                id.clone(),
                AuditAction::SlaViolation,
                response.approver,
                serde_json::json!({ "sla_expires_at": deadline }),
                serde_json::json!({
                    "resolved_at": outcome.resolved_at,
                    "error": violation.to_string(),
                }),
            ));
        }
        Ok(outcome)
    }

    /// Expire every pending request whose deadline passed before `now`,
    /// bump its escalation level and reviewer, and return the ids.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<CorrelationId> {
        let candidates: Vec<CorrelationId> = self
            .requests
            .iter()
            .filter(|r| r.status == ApprovalStatus::Pending && r.is_overdue(now))
            .map(|r| r.key().clone())
            .collect();

        let mut expired = Vec::with_capacity(candidates.len());
        for id in candidates {
            let (level, assigned_to, deadline) = match self.requests.try_get_mut(&id) {
                TryResult::Present(mut slot) => {
                    if slot.status != ApprovalStatus::Pending || !slot.is_overdue(now) {
                        continue;
                    }
                    slot.status = ApprovalStatus::Expired;
                    slot.escalation_level += 1;
                    slot.assigned_to = escalate_assignment(slot.assigned_to);
                    (slot.escalation_level, slot.assigned_to, slot.sla_expires_at)
                }
                TryResult::Locked => {
                    tracing::debug!(correlation_id = %id, "entry busy, leaving it to resolve");
                    continue;
                }
                TryResult::Absent => continue,
            };

            tracing::warn!(
                correlation_id = %id,
                escalation_level = level,
                assigned_to = %assigned_to,
                "approval request expired"
            );
            self.audit.record(AuditEntry::new(
                id.clone(),
                AuditAction::SlaExpired,
                SWEEPER,
                serde_json::json!({ "sla_expires_at": deadline, "swept_at": now }),
                serde_json::json!({ "escalation_level": level, "assigned_to": assigned_to }),
            ));
            expired.push(id);
        }
        expired
    }

    /// A snapshot of one request.
    pub fn get(&self, id: &CorrelationId) -> Option<ApprovalRequest> {
        self.requests.get(id).map(|r| r.value().clone())
    }

    /// Snapshots of all pending requests, earliest deadline first.
    pub fn pending(&self) -> Vec<ApprovalRequest> {
        let mut out: Vec<ApprovalRequest> = self
            .requests
            .iter()
            .filter(|r| r.status == ApprovalStatus::Pending)
            .map(|r| r.value().clone())
            .collect();
        out.sort_by_key(|r| r.sla_expires_at);
        out
    }

    /// Number of requests ever submitted.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether nothing was ever submitted.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Queue-derived HIL metrics. Facade counters are zero.
    pub fn metrics(&self) -> HilMetrics {
        let mut acc = MetricsAccumulator::default();
        for r in self.requests.iter() {
            acc.observe(r.value());
        }
        acc.finish()
    }
}

impl std::fmt::Debug for ApprovalQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalQueue")
            .field("requests", &self.requests.len())
            .finish()
    }
}
