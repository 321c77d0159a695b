//! # Escalation Gate
//!
//! Decides whether a human must review a combined recommendation, computes
//! the review SLA, and maps a human response to a [`FinalRecommendation`].
//!
//! ## State Machine
//!
//! ```text
//! Evaluated ──▶ AutoExecute
//!     │
//!     └──▶ PendingApproval ──▶ Resolved
//!                 │
//!                 └──▶ Expired ──▶ Resolved (late, sla_compliant = false)
//! ```
//!
//! The gate itself is pure: [`EscalationGate::evaluate`] reads the request,
//! the advisory response, and the policy. Only the
//! [`ApprovalQueue`](crate::ApprovalQueue) holds state.
//!
//! ## Trigger Order
//!
//! First match wins: low confidence, conflicting recommendations, high
//! value, low compliance confidence, manual review. A combined `Review` or
//! `Escalate` recommendation counts as a manual-review request.

use std::collections::BTreeMap;

use arbiter_advisory::{AdvisoryResponse, CombinedRecommendation, EscalationTarget, RiskRecommendation, Stance};
use arbiter_core::{AdvisoryRequest, BusinessImpact, CorrelationId, Priority, RequestType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::{EscalationThresholds, SlaPolicy};
use crate::queue::ApprovalRequest;

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// Why a human was pulled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTrigger {
    /// Combined confidence below threshold.
    LowConfidence,
    /// One output approve-like, another reject-like.
    ConflictingRecommendations,
    /// High-value indicator present.
    HighValueTransaction,
    /// Compliance confidence below threshold.
    ComplianceEscalation,
    /// Explicit or recommended human review.
    ManualReview,
}

impl EscalationTrigger {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowConfidence => "low_confidence",
            Self::ConflictingRecommendations => "conflicting_recommendations",
            Self::HighValueTransaction => "high_value_transaction",
            Self::ComplianceEscalation => "compliance_escalation",
            Self::ManualReview => "manual_review",
        }
    }

    /// Default reviewer for requests raised by this trigger.
    pub fn default_assignee(&self) -> EscalationTarget {
        match self {
            Self::ConflictingRecommendations | Self::ComplianceEscalation => {
                EscalationTarget::Compliance
            }
            Self::HighValueTransaction => EscalationTarget::Management,
            Self::LowConfidence | Self::ManualReview => EscalationTarget::Supervisor,
        }
    }
}

impl std::fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Gate output
// ---------------------------------------------------------------------------

/// Everything a reviewer needs to decide, captured at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditBundle {
    /// The original request.
    pub request: AdvisoryRequest,
    /// The engine's response.
    pub response: AdvisoryResponse,
    /// The trigger that fired.
    pub trigger: EscalationTrigger,
    /// Human-readable detail of the trigger.
    pub reason: String,
    /// When the gate evaluated the response.
    pub evaluated_at: DateTime<Utc>,
}

/// A request for human review, ready to be submitted to the queue.
///
/// Carries the SLA window but not the deadline: the deadline is fixed when
/// the queue accepts the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HilDecisionRequest {
    /// Correlation id of the advisory request.
    pub correlation_id: CorrelationId,
    /// Kind of action under review.
    pub request_type: RequestType,
    /// Review urgency.
    pub urgency: Priority,
    /// Trigger that fired.
    pub trigger: EscalationTrigger,
    /// Business impact used to scale the SLA.
    pub business_impact: BusinessImpact,
    /// Adjusted SLA window in seconds.
    pub sla_seconds: i64,
    /// Initial reviewer.
    pub assigned_to: EscalationTarget,
    /// Inputs and intermediate decisions.
    pub audit_bundle: AuditBundle,
    /// Flat key/value context for dashboards.
    pub metadata: BTreeMap<String, String>,
}

/// What the gate decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum EscalationDecision {
    /// No trigger fired; execute the combined recommendation.
    AutoExecute {
        /// The recommendation to execute.
        recommendation: CombinedRecommendation,
    },
    /// A human must review.
    RequiresApproval(Box<HilDecisionRequest>),
}

// ---------------------------------------------------------------------------
// Human response
// ---------------------------------------------------------------------------

/// The reviewer's action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApprovalAction {
    /// Execute the engine's recommendation.
    Approve,
    /// Block the action.
    Deny,
    /// Route further up.
    Escalate {
        /// Who.
        to: EscalationTarget,
        /// Why.
        reason: String,
    },
    /// Ask the submitter for more information.
    RequestMoreInfo {
        /// Questions for the submitter.
        questions: Vec<String>,
    },
    /// Noted; execute the engine's recommendation.
    Acknowledge,
}

impl ApprovalAction {
    /// Variant name for audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
            Self::Escalate { .. } => "escalate",
            Self::RequestMoreInfo { .. } => "request_more_info",
            Self::Acknowledge => "acknowledge",
        }
    }
}

/// A human reviewer's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    /// The action taken.
    pub action: ApprovalAction,
    /// Principal of the reviewer.
    pub approver: String,
    /// Free-text justification.
    #[serde(default)]
    pub reasoning: String,
    /// When the response was given; the SLA is checked against this.
    pub timestamp: DateTime<Utc>,
}

impl ApprovalResponse {
    /// A response stamped with the current time.
    pub fn new(action: ApprovalAction, approver: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            action,
            approver: approver.into(),
            reasoning: reasoning.into(),
            timestamp: Utc::now(),
        }
    }

    /// Builder: override the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// What the originating system should do after human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FinalRecommendation {
    /// Execute the engine's recommendation as-is.
    ExecuteOriginal {
        /// The recommendation.
        recommendation: CombinedRecommendation,
    },
    /// Block the action.
    Block {
        /// Why.
        reason: String,
    },
    /// Route further up.
    Escalate {
        /// Who.
        to: EscalationTarget,
        /// Why.
        reason: String,
    },
    /// Ask for more information first.
    RequestAdditionalInfo {
        /// Questions for the submitter.
        questions: Vec<String>,
    },
}

impl FinalRecommendation {
    /// Variant name for audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExecuteOriginal { .. } => "execute_original",
            Self::Block { .. } => "block",
            Self::Escalate { .. } => "escalate",
            Self::RequestAdditionalInfo { .. } => "request_additional_info",
        }
    }
}

/// Result of resolving a queued request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HilOutcome {
    /// The resolved request.
    pub correlation_id: CorrelationId,
    /// What to do now.
    pub final_recommendation: FinalRecommendation,
    /// Operator-facing steps.
    pub execution_instructions: Vec<String>,
    /// Who resolved it.
    pub approver: String,
    /// When.
    pub resolved_at: DateTime<Utc>,
    /// Whether the response beat the SLA deadline.
    pub sla_compliant: bool,
    /// Seconds from submission to response.
    pub resolution_secs: i64,
}

// ---------------------------------------------------------------------------
// EscalationGate
// ---------------------------------------------------------------------------

/// Trigger evaluation, urgency, and SLA computation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EscalationGate {
    thresholds: EscalationThresholds,
    sla: SlaPolicy,
}

impl EscalationGate {
    /// Create a gate with the given policy.
    pub fn new(thresholds: EscalationThresholds, sla: SlaPolicy) -> Self {
        Self { thresholds, sla }
    }

    /// The SLA policy.
    pub fn sla_policy(&self) -> &SlaPolicy {
        &self.sla
    }

    /// The first trigger that fires, with a detail message.
    pub fn trigger(
        &self,
        request: &AdvisoryRequest,
        response: &AdvisoryResponse,
    ) -> Option<(EscalationTrigger, String)> {
        let confidence = response.combined.overall_confidence;
        if self.thresholds.is_low(confidence) {
            return Some((
                EscalationTrigger::LowConfidence,
                format!(
                    "combined confidence {confidence} below {}",
                    self.thresholds.low_confidence
                ),
            ));
        }
        if let Some(detail) = conflict(response) {
            return Some((EscalationTrigger::ConflictingRecommendations, detail));
        }
        if request.payload.is_high_value() {
            let tier = request
                .payload
                .amount_tier()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "flagged".into());
            return Some((
                EscalationTrigger::HighValueTransaction,
                format!("high-value transaction ({tier})"),
            ));
        }
        if let Some(c) = &response.compliance {
            if self.thresholds.is_low_compliance(c.overall_confidence) {
                return Some((
                    EscalationTrigger::ComplianceEscalation,
                    format!(
                        "compliance confidence {} below {}",
                        c.overall_confidence, self.thresholds.compliance_confidence
                    ),
                ));
            }
        }
        if request.payload.manual_review {
            return Some((EscalationTrigger::ManualReview, "manual review requested".into()));
        }
        if response.combined.recommendation.needs_human() {
            return Some((
                EscalationTrigger::ManualReview,
                format!(
                    "combined recommendation is {}",
                    response.combined.recommendation.kind()
                ),
            ));
        }
        None
    }

    /// Review urgency for a trigger.
    pub fn urgency(&self, trigger: EscalationTrigger, confidence: arbiter_core::Confidence) -> Priority {
        match trigger {
            EscalationTrigger::ConflictingRecommendations | EscalationTrigger::ComplianceEscalation => {
                Priority::Critical
            }
            EscalationTrigger::HighValueTransaction => Priority::High,
            EscalationTrigger::LowConfidence if self.thresholds.is_very_low(confidence) => {
                Priority::High
            }
            EscalationTrigger::LowConfidence | EscalationTrigger::ManualReview => Priority::Medium,
        }
    }

    /// Evaluate a response.
    pub fn evaluate(
        &self,
        request: &AdvisoryRequest,
        response: &AdvisoryResponse,
        now: DateTime<Utc>,
    ) -> EscalationDecision {
        let Some((trigger, reason)) = self.trigger(request, response) else {
            tracing::debug!(
                correlation_id = %request.correlation_id.as_str(),
                recommendation = response.combined.recommendation.kind(),
                "no escalation trigger, auto-executing"
            );
            return EscalationDecision::AutoExecute {
                recommendation: response.combined.recommendation.clone(),
            };
        };

        let urgency = self.urgency(trigger, response.combined.overall_confidence);
        let impact = request.payload.business_impact;
        let sla_seconds = self.sla.adjusted_seconds(urgency, impact);
        let assigned_to = response
            .risk
            .as_ref()
            .and_then(|r| match &r.recommendation {
                RiskRecommendation::Escalate { to, .. } => Some(*to),
                _ => None,
            })
            .unwrap_or_else(|| trigger.default_assignee());

        let mut metadata = BTreeMap::new();
        metadata.insert("trigger".to_string(), trigger.as_str().to_string());
        metadata.insert("business_impact".to_string(), impact.as_str().to_string());
        metadata.insert(
            "recommendation".to_string(),
            response.combined.recommendation.kind().to_string(),
        );
        metadata.insert("fallback_used".to_string(), response.fallback_used.to_string());
        metadata.insert("submitter".to_string(), request.submitter_id.short().to_string());

        tracing::debug!(
            correlation_id = %request.correlation_id.as_str(),
            trigger = %trigger,
            urgency = %urgency,
            sla_seconds,
            "escalation required"
        );

        EscalationDecision::RequiresApproval(Box::new(HilDecisionRequest {
            correlation_id: request.correlation_id.clone(),
            request_type: request.request_type,
            urgency,
            trigger,
            business_impact: impact,
            sla_seconds,
            assigned_to,
            audit_bundle: AuditBundle {
                request: request.clone(),
                response: response.clone(),
                trigger,
                reason,
                evaluated_at: now,
            },
            metadata,
        }))
    }

    /// Map a human response on a queued request to its outcome.
    pub fn outcome(request: &ApprovalRequest, response: &ApprovalResponse) -> HilOutcome {
        let final_recommendation = match &response.action {
            ApprovalAction::Approve | ApprovalAction::Acknowledge => {
                FinalRecommendation::ExecuteOriginal {
                    recommendation: request.audit_bundle().response.combined.recommendation.clone(),
                }
            }
            ApprovalAction::Deny => FinalRecommendation::Block {
                reason: if response.reasoning.trim().is_empty() {
                    format!("denied by {}", response.approver)
                } else {
                    response.reasoning.clone()
                },
            },
            ApprovalAction::Escalate { to, reason } => FinalRecommendation::Escalate {
                to: *to,
                reason: reason.clone(),
            },
            ApprovalAction::RequestMoreInfo { questions } => {
                FinalRecommendation::RequestAdditionalInfo {
                    questions: questions.clone(),
                }
            }
        };
        let execution_instructions =
            instructions(&final_recommendation, request.request_type(), &response.approver);
        let resolved_at = response.timestamp;
        HilOutcome {
            correlation_id: request.correlation_id().clone(),
            final_recommendation,
            execution_instructions,
            approver: response.approver.clone(),
            resolved_at,
            sla_compliant: resolved_at <= request.sla_expires_at(),
            resolution_secs: (resolved_at - request.submitted_at()).num_seconds().max(0),
        }
    }
}

fn conflict(response: &AdvisoryResponse) -> Option<String> {
    let compliance = response.compliance.as_ref()?;
    if let Some(scored) = &compliance.scored {
        let a = Stance::of_compliance(scored);
        let b = Stance::of_compliance(&compliance.rules);
        if a.conflicts_with(b) {
            return Some(format!(
                "scored compliance {} conflicts with rules {}",
                scored.decision(),
                compliance.rules.decision()
            ));
        }
    }
    if let Some(risk) = &response.risk {
        let a = Stance::of_risk(&risk.recommendation);
        let b = Stance::of_compliance(&compliance.recommendation);
        if a.conflicts_with(b) {
            return Some(format!(
                "risk {} conflicts with compliance {}",
                risk.recommendation.kind(),
                compliance.recommendation.decision()
            ));
        }
    }
    None
}

fn instructions(rec: &FinalRecommendation, request_type: RequestType, approver: &str) -> Vec<String> {
    match rec {
        FinalRecommendation::ExecuteOriginal { recommendation } => {
            let mut steps = match recommendation {
                CombinedRecommendation::Proceed { conditions, .. } => {
                    let mut s = vec![format!("Proceed with {request_type}")];
                    s.extend(conditions.iter().map(|c| format!("Verify condition: {c}")));
                    s
                }
                CombinedRecommendation::Block { reasons, .. } => {
                    let mut s = vec![format!("Keep {request_type} blocked")];
                    s.extend(reasons.iter().map(|r| format!("Record reason: {r}")));
                    s
                }
                CombinedRecommendation::Review { .. } | CombinedRecommendation::Escalate { .. } => {
                    vec![format!("Proceed with {request_type} as approved on review")]
                }
            };
            steps.push(format!("Record approval by {approver} in the audit trail"));
            steps.push("Notify the submitter of the outcome".into());
            steps
        }
        FinalRecommendation::Block { reason } => vec![
            format!("Halt {request_type}"),
            format!("Record denial reason: {reason}"),
            "Notify the submitter of the denial".into(),
        ],
        FinalRecommendation::Escalate { to, reason } => vec![
            format!("Route {request_type} to {to}"),
            format!("Attach the audit bundle and escalation reason: {reason}"),
            format!("Keep {request_type} on hold until {to} responds"),
        ],
        FinalRecommendation::RequestAdditionalInfo { questions } => {
            let mut steps = vec![format!("Keep {request_type} on hold pending answers")];
            steps.extend(questions.iter().map(|q| format!("Ask the submitter: {q}")));
            steps.push("Resubmit for advice once answers arrive".into());
            steps
        }
    }
}
