//! # arbiter-hil: Human-in-the-Loop Workflow
//!
//! Everything after the advisory pipeline:
//!
//! - **Escalation** ([`escalation`]): trigger evaluation, urgency, SLA
//!   computation, and the mapping from a human response to a final
//!   recommendation with execution instructions.
//!
//! - **Queue** ([`queue`]): the store of pending review requests, with
//!   per-key locking and a best-effort expiry sweep.
//!
//! - **Audit** ([`audit`]): the append-only [`AuditSink`] every component
//!   records to.
//!
//! - **Policy** ([`policy`]) and **metrics** ([`metrics`]).
//!
//! The gate is pure. The queue is the only stateful component; it is
//! constructed by the hosting service and shared by reference.

pub mod audit;
pub mod error;
pub mod escalation;
pub mod metrics;
pub mod policy;
pub mod queue;

// Re-export primary types.
pub use audit::{AuditAction, AuditEntry, AuditSink, InMemoryAuditLog, TracingAuditSink};
pub use error::QueueError;
pub use escalation::{
    ApprovalAction, ApprovalResponse, AuditBundle, EscalationDecision, EscalationGate,
    EscalationTrigger, FinalRecommendation, HilDecisionRequest, HilOutcome,
};
pub use metrics::HilMetrics;
pub use policy::{EscalationThresholds, ImpactMultipliers, SlaPolicy};
pub use queue::{ApprovalQueue, ApprovalRequest, ApprovalStatus};
