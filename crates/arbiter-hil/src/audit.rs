//! # Audit Trail
//!
//! Append-only record of every decision the engine makes, grouped by
//! correlation id.
//!
//! ## Invariants
//!
//! - Entries are never mutated, trimmed, or deduplicated. A duplicate entry
//!   is acceptable; a lost one is not.
//! - Every entry is individually digestable: [`AuditEntry::digest`] hashes
//!   the entry's JSON form with SHA-256. `serde_json` maps are ordered, so
//!   the digest is deterministic.
//!
//! Components never own a log directly; they hold an
//! `Arc<dyn AuditSink>` injected by the hosting service.

use std::collections::HashMap;

use arbiter_core::CorrelationId;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// An advisory request was accepted.
    AdvisoryRequested,
    /// A request repeated an idempotency key already answered.
    DuplicateRequest,
    /// A request failed shape validation.
    ValidationFailed,
    /// The risk scorer produced an assessment.
    RiskScored,
    /// The compliance engine produced a result.
    ComplianceChecked,
    /// The compliance strategies disagreed and were settled.
    TieBreakerApplied,
    /// The combiner produced a recommendation.
    RecommendationCombined,
    /// The rules-only path replaced the scored path.
    FallbackUsed,
    /// The escalation gate evaluated a response.
    EscalationEvaluated,
    /// No human was needed.
    AutoExecuted,
    /// A request entered the approval queue.
    ApprovalSubmitted,
    /// A human resolved a queued request.
    ApprovalResolved,
    /// A human response arrived after the SLA deadline.
    SlaViolation,
    /// The sweeper expired a pending request.
    SlaExpired,
}

impl AuditAction {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdvisoryRequested => "advisory_requested",
            Self::DuplicateRequest => "duplicate_request",
            Self::ValidationFailed => "validation_failed",
            Self::RiskScored => "risk_scored",
            Self::ComplianceChecked => "compliance_checked",
            Self::TieBreakerApplied => "tie_breaker_applied",
            Self::RecommendationCombined => "recommendation_combined",
            Self::FallbackUsed => "fallback_used",
            Self::EscalationEvaluated => "escalation_evaluated",
            Self::AutoExecuted => "auto_executed",
            Self::ApprovalSubmitted => "approval_submitted",
            Self::ApprovalResolved => "approval_resolved",
            Self::SlaViolation => "sla_violation",
            Self::SlaExpired => "sla_expired",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditEntry
// ---------------------------------------------------------------------------

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Which request this belongs to.
    pub correlation_id: CorrelationId,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub action: AuditAction,
    /// Principal or component responsible.
    pub action_by: String,
    /// Inputs relevant to the decision.
    pub context: serde_json::Value,
    /// The decision or outcome.
    pub result: serde_json::Value,
}

impl AuditEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        correlation_id: CorrelationId,
        action: AuditAction,
        action_by: impl Into<String>,
        context: serde_json::Value,
        result: serde_json::Value,
    ) -> Self {
        Self {
            correlation_id,
            timestamp: Utc::now(),
            action,
            action_by: action_by.into(),
            context,
            result,
        }
    }

    /// Hex SHA-256 of the entry's JSON form.
    ///
    /// Returns `None` only if the entry cannot be serialized, which
    /// well-formed entries never trigger.
    pub fn digest(&self) -> Option<String> {
        let bytes = match serde_json::to_vec(self) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(
                    correlation_id = %self.correlation_id.as_str(),
                    action = %self.action,
                    error = %e,
                    "audit entry serialization failed, digest unavailable"
                );
                return None;
            }
        };
        let hash = Sha256::digest(&bytes);
        Some(hash.iter().map(|b| format!("{b:02x}")).collect())
    }
}

// ---------------------------------------------------------------------------
// AuditSink
// ---------------------------------------------------------------------------

/// Destination for audit entries.
///
/// Implementations must be append-only: `record` never fails from the
/// caller's point of view and never drops an entry.
pub trait AuditSink: Send + Sync {
    /// Append an entry.
    fn record(&self, entry: AuditEntry);

    /// All entries for a correlation id, in recording order.
    fn entries_for(&self, correlation_id: &CorrelationId) -> Vec<AuditEntry>;

    /// Total number of entries.
    fn len(&self) -> usize;

    /// Whether nothing has been recorded.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// InMemoryAuditLog
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LogInner {
    entries: Vec<AuditEntry>,
    by_correlation: HashMap<CorrelationId, Vec<usize>>,
}

/// In-process audit log with a per-correlation index.
#[derive(Default)]
pub struct InMemoryAuditLog {
    inner: RwLock<LogInner>,
}

impl InMemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, entry: AuditEntry) {
        let mut inner = self.inner.write();
        let index = inner.entries.len();
        inner
            .by_correlation
            .entry(entry.correlation_id.clone())
            .or_default()
            .push(index);
        inner.entries.push(entry);
    }

    fn entries_for(&self, correlation_id: &CorrelationId) -> Vec<AuditEntry> {
        let inner = self.inner.read();
        inner
            .by_correlation
            .get(correlation_id)
            .map(|indices| indices.iter().map(|&i| inner.entries[i].clone()).collect())
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.inner.read().entries.len()
    }
}

impl std::fmt::Debug for InMemoryAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("InMemoryAuditLog")
            .field("entries", &inner.entries.len())
            .field("correlation_ids", &inner.by_correlation.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TracingAuditSink
// ---------------------------------------------------------------------------

/// Decorator that mirrors every entry to `tracing` before storing it.
#[derive(Debug, Default)]
pub struct TracingAuditSink<S> {
    inner: S,
}

impl<S: AuditSink> TracingAuditSink<S> {
    /// Wrap a sink.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: AuditSink> AuditSink for TracingAuditSink<S> {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "arbiter::audit",
            correlation_id = %entry.correlation_id.as_str(),
            action = %entry.action,
            action_by = %entry.action_by,
            result = %entry.result,
            "audit"
        );
        self.inner.record(entry);
    }

    fn entries_for(&self, correlation_id: &CorrelationId) -> Vec<AuditEntry> {
        self.inner.entries_for(correlation_id)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
