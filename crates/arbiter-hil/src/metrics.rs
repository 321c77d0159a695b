//! # HIL Metrics
//!
//! Point-in-time summary of the human-review workflow. The queue fills the
//! request-derived fields; the hosting service adds its own counters with
//! [`HilMetrics::with_counters`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::queue::{ApprovalRequest, ApprovalStatus};

/// HIL workflow metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HilMetrics {
    /// Requests ever submitted.
    pub submitted: u64,
    /// Awaiting a response, deadline not yet swept.
    pub pending: u64,
    /// Resolved by a human (on time or late).
    pub resolved: u64,
    /// Swept as expired and still unresolved.
    pub expired: u64,
    /// Responses that never needed a human.
    pub auto_executed: u64,
    /// Resolutions at or before the deadline.
    pub sla_compliant: u64,
    /// Late resolutions plus unresolved expiries.
    pub sla_violations: u64,
    /// `sla_compliant / (sla_compliant + sla_violations)`; 1.0 when nothing
    /// has finished yet.
    pub sla_compliance_rate: f64,
    /// Responses produced by the rules-only path.
    pub fallback_count: u64,
    /// Submitted requests per trigger.
    pub by_trigger: BTreeMap<String, u64>,
    /// Submitted requests per urgency.
    pub by_urgency: BTreeMap<String, u64>,
    /// Mean time to resolution, if anything was resolved.
    pub average_resolution_secs: Option<f64>,
}

impl HilMetrics {
    /// Add the hosting service's counters.
    pub fn with_counters(mut self, auto_executed: u64, fallback_count: u64) -> Self {
        self.auto_executed = auto_executed;
        self.fallback_count = fallback_count;
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct MetricsAccumulator {
    metrics: HilMetrics,
    resolution_secs_total: i64,
}

impl MetricsAccumulator {
    pub(crate) fn observe(&mut self, request: &ApprovalRequest) {
        let m = &mut self.metrics;
        m.submitted += 1;
        *m.by_trigger
            .entry(request.trigger().as_str().to_string())
            .or_default() += 1;
        *m.by_urgency
            .entry(request.priority().as_str().to_string())
            .or_default() += 1;
        match request.status() {
            ApprovalStatus::Pending => m.pending += 1,
            ApprovalStatus::Expired => {
                m.expired += 1;
                m.sla_violations += 1;
            }
            ApprovalStatus::Resolved => {
                m.resolved += 1;
                if let Some(outcome) = request.outcome() {
                    self.resolution_secs_total += outcome.resolution_secs;
                    if outcome.sla_compliant {
                        m.sla_compliant += 1;
                    } else {
                        m.sla_violations += 1;
                    }
                }
            }
        }
    }

    pub(crate) fn finish(mut self) -> HilMetrics {
        let finished = self.metrics.sla_compliant + self.metrics.sla_violations;
        self.metrics.sla_compliance_rate = if finished == 0 {
            1.0
        } else {
            self.metrics.sla_compliant as f64 / finished as f64
        };
        self.metrics.average_resolution_secs = (self.metrics.resolved > 0)
            .then(|| self.resolution_secs_total as f64 / self.metrics.resolved as f64);
        self.metrics
    }
}
