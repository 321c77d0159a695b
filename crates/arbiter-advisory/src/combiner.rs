//! # Arbitration Combiner
//!
//! Merges the risk and compliance outputs for one action into a single
//! [`CombinedRecommendation`]. Each input is first reduced to a [`Stance`];
//! when both ran, the more cautious stance wins:
//!
//! ```text
//! Block > Review (escalate/review) > Review (info/documentation) > Proceed
//! ```
//!
//! With only one input the recommendation maps across directly. With
//! neither, the result is a conservative review tagged `no_advisory_data`;
//! missing advisory data never proceeds.

use arbiter_core::{Confidence, Priority};
use serde::{Deserialize, Serialize};

use crate::compliance::{ComplianceRecommendation, ComplianceResponse};
use crate::risk::{RiskAdvice, RiskRecommendation};

/// Critical-priority approvals are capped at this confidence.
pub const CRITICAL_PRIORITY_CAP: f64 = 0.85;
/// Low-priority approvals are floored at this confidence.
pub const LOW_PRIORITY_FLOOR: f64 = 0.75;
/// Discount applied when only one component ran.
pub const SINGLE_COMPONENT_FACTOR: f64 = 0.9;
/// Overall confidence when no component ran.
pub const NO_DATA_OVERALL: f64 = 0.3;
/// Recommendation confidence when no component ran.
pub const NO_DATA_CONFIDENCE: f64 = 0.5;
/// Concern attached when no component ran.
pub const NO_ADVISORY_DATA: &str = "no_advisory_data";

/// The final advisory recommendation for one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombinedRecommendation {
    /// Go ahead, subject to `conditions`.
    Proceed {
        /// Confidence.
        confidence: Confidence,
        /// Conditions attached to proceeding.
        conditions: Vec<String>,
    },
    /// Do not go ahead.
    Block {
        /// Confidence.
        confidence: Confidence,
        /// Why.
        reasons: Vec<String>,
    },
    /// A human should look first.
    Review {
        /// Confidence.
        confidence: Confidence,
        /// What to look at.
        concerns: Vec<String>,
    },
    /// Route to a human at the given urgency.
    Escalate {
        /// Confidence.
        confidence: Confidence,
        /// How fast.
        urgency: Priority,
    },
}

impl CombinedRecommendation {
    /// Confidence carried by the variant.
    pub fn confidence(&self) -> Confidence {
        match self {
            Self::Proceed { confidence, .. }
            | Self::Block { confidence, .. }
            | Self::Review { confidence, .. }
            | Self::Escalate { confidence, .. } => *confidence,
        }
    }

    /// Variant name for audit records and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Proceed { .. } => "proceed",
            Self::Block { .. } => "block",
            Self::Review { .. } => "review",
            Self::Escalate { .. } => "escalate",
        }
    }

    /// Whether a human must look at this regardless of confidence.
    pub fn needs_human(&self) -> bool {
        matches!(self, Self::Review { .. } | Self::Escalate { .. })
    }

    /// The same recommendation at a different confidence.
    pub fn with_confidence(self, confidence: Confidence) -> Self {
        match self {
            Self::Proceed { conditions, .. } => Self::Proceed {
                confidence,
                conditions,
            },
            Self::Block { reasons, .. } => Self::Block {
                confidence,
                reasons,
            },
            Self::Review { concerns, .. } => Self::Review {
                confidence,
                concerns,
            },
            Self::Escalate { urgency, .. } => Self::Escalate {
                confidence,
                urgency,
            },
        }
    }
}

/// Combiner output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResponse {
    /// The recommendation.
    pub recommendation: CombinedRecommendation,
    /// Average of component confidences, single component × 0.9, or 0.3.
    pub overall_confidence: Confidence,
}

/// What a single advisory output leans toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Release / approve.
    Approve,
    /// Hold / reject.
    Block,
    /// Escalate / require review.
    Review,
    /// Request information or documentation.
    Info,
}

impl Stance {
    /// Stance of a risk recommendation.
    pub fn of_risk(rec: &RiskRecommendation) -> Self {
        match rec {
            RiskRecommendation::Release => Self::Approve,
            RiskRecommendation::Hold { .. } => Self::Block,
            RiskRecommendation::Escalate { .. } => Self::Review,
            RiskRecommendation::RequestAdditionalInfo { .. } => Self::Info,
        }
    }

    /// Stance of a compliance recommendation.
    pub fn of_compliance(rec: &ComplianceRecommendation) -> Self {
        match rec {
            ComplianceRecommendation::Approve { .. } => Self::Approve,
            ComplianceRecommendation::Reject { .. } => Self::Block,
            ComplianceRecommendation::RequireReview { .. } => Self::Review,
            ComplianceRecommendation::RequestDocumentation { .. } => Self::Info,
        }
    }

    /// One approve-like and one reject-like.
    pub fn conflicts_with(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Approve, Self::Block) | (Self::Block, Self::Approve)
        )
    }
}

/// Stateless combiner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArbitrationCombiner;

impl ArbitrationCombiner {
    /// Create a combiner.
    pub fn new() -> Self {
        Self
    }

    /// Combine whichever outputs ran.
    pub fn combine(
        &self,
        risk: Option<&RiskAdvice>,
        compliance: Option<&ComplianceResponse>,
        priority: Priority,
    ) -> CombinedResponse {
        let response = match (risk, compliance) {
            (Some(r), Some(c)) => both(r, &c.recommendation, priority),
            (Some(r), None) => CombinedResponse {
                recommendation: from_risk(r),
                overall_confidence: r.confidence.scaled(SINGLE_COMPONENT_FACTOR),
            },
            (None, Some(c)) => CombinedResponse {
                recommendation: from_compliance(&c.recommendation),
                overall_confidence: c
                    .recommendation
                    .confidence()
                    .scaled(SINGLE_COMPONENT_FACTOR),
            },
            (None, None) => CombinedResponse {
                recommendation: CombinedRecommendation::Review {
                    confidence: Confidence::new(NO_DATA_CONFIDENCE),
                    concerns: vec![NO_ADVISORY_DATA.to_string()],
                },
                overall_confidence: Confidence::new(NO_DATA_OVERALL),
            },
        };
        tracing::debug!(
            recommendation = response.recommendation.kind(),
            confidence = response.recommendation.confidence().value(),
            overall_confidence = response.overall_confidence.value(),
            risk = risk.is_some(),
            compliance = compliance.is_some(),
            "recommendations combined"
        );
        response
    }

    /// Combine on the fallback path: any recommendation backed by at least
    /// one deterministic component is reported at confidence 1.0.
    pub fn combine_fallback(
        &self,
        risk: Option<&RiskAdvice>,
        compliance: Option<&ComplianceResponse>,
        priority: Priority,
    ) -> CombinedResponse {
        let response = self.combine(risk, compliance, priority);
        if risk.is_none() && compliance.is_none() {
            return response;
        }
        CombinedResponse {
            recommendation: response.recommendation.with_confidence(Confidence::CERTAIN),
            overall_confidence: Confidence::CERTAIN,
        }
    }
}

fn both(risk: &RiskAdvice, compliance: &ComplianceRecommendation, priority: Priority) -> CombinedResponse {
    let rs = Stance::of_risk(&risk.recommendation);
    let cs = Stance::of_compliance(compliance);
    let rc = risk.confidence;
    let cc = compliance.confidence();
    let avg = Confidence::blend(rc, 0.5, cc, 0.5);

    let mut notes = risk_notes(&risk.recommendation);
    if cs != Stance::Approve {
        for item in compliance.details() {
            if !notes.contains(item) {
                notes.push(item.clone());
            }
        }
    }

    let any = |s: Stance| rs == s || cs == s;
    let recommendation = if any(Stance::Block) {
        CombinedRecommendation::Block {
            confidence: rc.min(cc),
            reasons: notes,
        }
    } else if any(Stance::Review) || any(Stance::Info) {
        CombinedRecommendation::Review {
            confidence: avg,
            concerns: notes,
        }
    } else {
        let adjusted = match priority {
            Priority::Critical => avg.min(Confidence::new(CRITICAL_PRIORITY_CAP)),
            Priority::Low => avg.max(Confidence::new(LOW_PRIORITY_FLOOR)),
            Priority::Medium | Priority::High => avg,
        };
        CombinedRecommendation::Proceed {
            confidence: adjusted,
            conditions: compliance.details().to_vec(),
        }
    };
    CombinedResponse {
        recommendation,
        overall_confidence: avg,
    }
}

fn risk_notes(rec: &RiskRecommendation) -> Vec<String> {
    match rec {
        RiskRecommendation::Release => Vec::new(),
        RiskRecommendation::Hold { reason } => vec![reason.clone()],
        RiskRecommendation::RequestAdditionalInfo { questions } => questions.clone(),
        RiskRecommendation::Escalate { to, urgency } => {
            vec![format!("risk_escalation:{to}:{urgency}")]
        }
    }
}

fn from_risk(risk: &RiskAdvice) -> CombinedRecommendation {
    let confidence = risk.confidence;
    match &risk.recommendation {
        RiskRecommendation::Release => CombinedRecommendation::Proceed {
            confidence,
            conditions: Vec::new(),
        },
        RiskRecommendation::Hold { reason } => CombinedRecommendation::Block {
            confidence,
            reasons: vec![reason.clone()],
        },
        RiskRecommendation::RequestAdditionalInfo { questions } => CombinedRecommendation::Review {
            confidence,
            concerns: questions.clone(),
        },
        RiskRecommendation::Escalate { urgency, .. } => CombinedRecommendation::Escalate {
            confidence,
            urgency: *urgency,
        },
    }
}

fn from_compliance(rec: &ComplianceRecommendation) -> CombinedRecommendation {
    match rec {
        ComplianceRecommendation::Approve { confidence, checks } => CombinedRecommendation::Proceed {
            confidence: *confidence,
            conditions: checks.clone(),
        },
        ComplianceRecommendation::Reject {
            confidence,
            violations,
        } => CombinedRecommendation::Block {
            confidence: *confidence,
            reasons: violations.clone(),
        },
        ComplianceRecommendation::RequireReview {
            confidence,
            concerns,
        } => CombinedRecommendation::Review {
            confidence: *confidence,
            concerns: concerns.clone(),
        },
        ComplianceRecommendation::RequestDocumentation {
            confidence,
            requirements,
        } => CombinedRecommendation::Review {
            confidence: *confidence,
            concerns: requirements.clone(),
        },
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::compliance::ComplianceEngine;
    use crate::risk::RiskScorer;
    use arbiter_core::{AmountTier, ComplianceRequest, RiskInput, SanctionsStatus};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn combined_confidences_in_unit_interval(
            tier in 1u8..=5,
            disputes in 0u32..10,
            age in 0u32..200,
            blocked in any::<bool>(),
            with_risk in any::<bool>(),
            with_compliance in any::<bool>(),
        ) {
            let tier = AmountTier::new(tier).unwrap();
            let mut input = RiskInput::nominal(tier);
            input.dispute_count = disputes;
            input.age_days = age;
            let mut req = ComplianceRequest::nominal(tier);
            if blocked {
                req.sanctions = SanctionsStatus::Blocked;
            }
            let r = RiskScorer::new().assess(&input).advice();
            let c = ComplianceEngine::new().check(&req);
            let resp = ArbitrationCombiner::new().combine(
                with_risk.then_some(&r),
                with_compliance.then_some(&c),
                Priority::Medium,
            );
            prop_assert!((0.0..=1.0).contains(&resp.overall_confidence.value()));
            prop_assert!((0.0..=1.0).contains(&resp.recommendation.confidence().value()));
            if blocked && with_compliance {
                prop_assert_eq!(resp.recommendation.kind(), "block");
            }
            if !with_risk && !with_compliance {
                prop_assert!(resp.recommendation.needs_human());
            }
        }
    }
}
