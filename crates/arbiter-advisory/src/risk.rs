//! # Risk Scorer
//!
//! Computes a normalized risk score and a first-pass recommendation from
//! escrow/transaction attributes.
//!
//! ## Scoring
//!
//! ```text
//! overall = 0.3·tier + 0.3·disputes + 0.2·age + 0.2·flags − milestone
//! ```
//!
//! | Factor       | Normalized value                                        |
//! |--------------|---------------------------------------------------------|
//! | amount tier  | tiers 1–5 → 0.1, 0.2, 0.4, 0.7, 0.9                     |
//! | disputes     | `min(count × 0.2, 1.0)`                                 |
//! | age          | < 1 day → 0.6, > 90 days → 0.8, > 30 days → 0.3, else 0.1 |
//! | flags        | `min(count × 0.3, 1.0)`                                 |
//! | participants | > 5 → 0.5, > 2 → 0.2, else 0.1 (audit only, weight 0)   |
//!
//! A milestone-backed escrow subtracts a flat 0.05. The result is clamped to
//! `[0, 1]`. A tier-5 amount always escalates to management, whatever the
//! other factors say.
//!
//! ## Fallback
//!
//! [`RiskScorer::fallback`] skips scoring entirely and applies fixed rules
//! with confidence 1.0. It always completes synchronously.

use arbiter_core::{Confidence, Priority, RiskCategory, RiskInput, RiskScore};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

/// Weight of the amount-tier factor.
pub const AMOUNT_TIER_WEIGHT: f64 = 0.3;
/// Weight of the dispute-history factor.
pub const DISPUTE_WEIGHT: f64 = 0.3;
/// Weight of the age factor.
pub const AGE_WEIGHT: f64 = 0.2;
/// Weight of the compliance-flag factor.
pub const COMPLIANCE_FLAG_WEIGHT: f64 = 0.2;

/// Normalized risk of tiers 1–5.
pub const TIER_RISK: [f64; 5] = [0.1, 0.2, 0.4, 0.7, 0.9];
/// Risk added per prior dispute.
pub const DISPUTE_STEP: f64 = 0.2;
/// Risk added per compliance flag.
pub const FLAG_STEP: f64 = 0.3;
/// Flat reduction for milestone-backed escrows.
pub const MILESTONE_MITIGATION: f64 = 0.05;

/// Scores at or below this release.
pub const RELEASE_CEILING: f64 = 0.3;
/// Scores at or below this (and above release) request more information.
pub const INFO_CEILING: f64 = 0.5;
/// Scores at or below this (and above info) hold. Above escalates.
pub const HOLD_CEILING: f64 = 0.8;
/// Tier that always escalates.
pub const ESCALATION_TIER: u8 = 5;

/// Floor of the scored-path confidence.
pub const SCORED_BASE_CONFIDENCE: f64 = 0.7;
/// Distance from the nearest decision boundary at which the scored path
/// reaches full confidence.
pub const BOUNDARY_MARGIN: f64 = 0.15;

/// Disputes above this count request information on the fallback path.
pub const FALLBACK_DISPUTE_LIMIT: u32 = 2;
/// Tier at or above which the fallback path requests information.
pub const FALLBACK_INFO_TIER: u8 = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Who an escalated action is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTarget {
    /// First-line reviewer.
    Supervisor,
    /// Management.
    Management,
    /// Compliance officer.
    Compliance,
    /// Legal counsel.
    Legal,
}

impl EscalationTarget {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supervisor => "supervisor",
            Self::Management => "management",
            Self::Compliance => "compliance",
            Self::Legal => "legal",
        }
    }
}

impl std::fmt::Display for EscalationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the risk scorer recommends for the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiskRecommendation {
    /// Let the action proceed.
    Release,
    /// Keep the action on hold.
    Hold {
        /// Why.
        reason: String,
    },
    /// Ask the submitter for more information.
    RequestAdditionalInfo {
        /// Operator-facing questions.
        questions: Vec<String>,
    },
    /// Route to a human.
    Escalate {
        /// Who.
        to: EscalationTarget,
        /// How fast.
        urgency: Priority,
    },
}

impl RiskRecommendation {
    /// Return the variant name for audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Hold { .. } => "hold",
            Self::RequestAdditionalInfo { .. } => "request_additional_info",
            Self::Escalate { .. } => "escalate",
        }
    }
}

/// One named contribution to the overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Factor name.
    pub name: String,
    /// Normalized factor value in `[0, 1]`.
    pub score: f64,
    /// Weight applied to `score`. Zero for audit-only signals.
    pub weight: f64,
}

impl RiskFactor {
    fn new(name: &str, score: f64, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            score,
            weight,
        }
    }

    /// `score × weight`.
    pub fn contribution(&self) -> f64 {
        self.score * self.weight
    }
}

/// Output of the scored path.
///
/// `risk_category` is always `overall_risk.category()`: both are set together
/// in [`RiskAssessment::new`] and recomputed on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RiskAssessmentRepr")]
pub struct RiskAssessment {
    overall_risk: RiskScore,
    risk_factors: Vec<RiskFactor>,
    mitigating_factors: Vec<RiskFactor>,
    risk_category: RiskCategory,
    recommended_action: RiskRecommendation,
    confidence: Confidence,
}

#[derive(Deserialize)]
struct RiskAssessmentRepr {
    overall_risk: RiskScore,
    #[serde(default)]
    risk_factors: Vec<RiskFactor>,
    #[serde(default)]
    mitigating_factors: Vec<RiskFactor>,
    recommended_action: RiskRecommendation,
    confidence: Confidence,
}

impl From<RiskAssessmentRepr> for RiskAssessment {
    fn from(r: RiskAssessmentRepr) -> Self {
        Self::new(
            r.overall_risk,
            r.risk_factors,
            r.mitigating_factors,
            r.recommended_action,
            r.confidence,
        )
    }
}

impl RiskAssessment {
    /// Assemble an assessment; the category is derived from the score.
    pub fn new(
        overall_risk: RiskScore,
        risk_factors: Vec<RiskFactor>,
        mitigating_factors: Vec<RiskFactor>,
        recommended_action: RiskRecommendation,
        confidence: Confidence,
    ) -> Self {
        Self {
            overall_risk,
            risk_factors,
            mitigating_factors,
            risk_category: overall_risk.category(),
            recommended_action,
            confidence,
        }
    }

    /// Overall risk in `[0, 1]`.
    pub fn overall_risk(&self) -> RiskScore {
        self.overall_risk
    }

    /// Contributing factors, including audit-only ones.
    pub fn risk_factors(&self) -> &[RiskFactor] {
        &self.risk_factors
    }

    /// Factors that reduced the score.
    pub fn mitigating_factors(&self) -> &[RiskFactor] {
        &self.mitigating_factors
    }

    /// Category derived from `overall_risk`.
    pub fn risk_category(&self) -> RiskCategory {
        self.risk_category
    }

    /// The recommendation.
    pub fn recommended_action(&self) -> &RiskRecommendation {
        &self.recommended_action
    }

    /// Confidence of the recommendation.
    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// The part of the assessment the combiner consumes.
    pub fn advice(&self) -> RiskAdvice {
        RiskAdvice {
            recommendation: self.recommended_action.clone(),
            confidence: self.confidence,
        }
    }
}

/// A risk recommendation with its confidence, from either path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAdvice {
    /// The recommendation.
    pub recommendation: RiskRecommendation,
    /// Its confidence.
    pub confidence: Confidence,
}

// ---------------------------------------------------------------------------
// RiskScorer
// ---------------------------------------------------------------------------

/// Stateless risk scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    /// Create a scorer.
    pub fn new() -> Self {
        Self
    }

    /// Scored path: weighted factors, category, recommendation.
    pub fn assess(&self, input: &RiskInput) -> RiskAssessment {
        let factors = vec![
            RiskFactor::new("amount_tier", tier_risk(input), AMOUNT_TIER_WEIGHT),
            RiskFactor::new("dispute_history", dispute_risk(input), DISPUTE_WEIGHT),
            RiskFactor::new("age", age_risk(input), AGE_WEIGHT),
            RiskFactor::new("compliance_flags", flag_risk(input), COMPLIANCE_FLAG_WEIGHT),
            RiskFactor::new("participant_complexity", participant_risk(input), 0.0),
        ];
        let mut mitigations = Vec::new();
        if input.milestone_backed {
            mitigations.push(RiskFactor::new("milestone_backed", MILESTONE_MITIGATION, 1.0));
        }

        let raw: f64 = factors.iter().map(RiskFactor::contribution).sum::<f64>()
            - mitigations.iter().map(RiskFactor::contribution).sum::<f64>();
        let overall = RiskScore::new(raw);

        let (recommendation, confidence) = if input.amount_tier.at_least(ESCALATION_TIER) {
            (
                RiskRecommendation::Escalate {
                    to: EscalationTarget::Management,
                    urgency: Priority::High,
                },
                Confidence::CERTAIN,
            )
        } else {
            (
                recommend_for_score(overall, input),
                scored_confidence(overall),
            )
        };

        tracing::debug!(
            overall_risk = overall.value(),
            category = %overall.category(),
            recommendation = recommendation.kind(),
            confidence = confidence.value(),
            "risk assessed"
        );

        RiskAssessment::new(overall, factors, mitigations, recommendation, confidence)
    }

    /// Rules-only path. Deterministic, confidence always 1.0.
    pub fn fallback(&self, input: &RiskInput) -> RiskAdvice {
        let recommendation = if input.amount_tier.at_least(ESCALATION_TIER) {
            RiskRecommendation::Escalate {
                to: EscalationTarget::Management,
                urgency: Priority::High,
            }
        } else if input.dispute_count > FALLBACK_DISPUTE_LIMIT {
            RiskRecommendation::RequestAdditionalInfo {
                questions: vec![DISPUTE_QUESTION.to_string()],
            }
        } else if input.amount_tier.at_least(FALLBACK_INFO_TIER) {
            RiskRecommendation::RequestAdditionalInfo {
                questions: vec![SOURCE_OF_FUNDS_QUESTION.to_string()],
            }
        } else {
            RiskRecommendation::Release
        };
        RiskAdvice {
            recommendation,
            confidence: Confidence::CERTAIN,
        }
    }
}

const DISPUTE_QUESTION: &str = "Provide resolution records for prior disputes";
const SOURCE_OF_FUNDS_QUESTION: &str = "Provide source-of-funds documentation";
const NEW_ACCOUNT_QUESTION: &str = "Confirm counterparty identity for a newly created escrow";
const FLAG_QUESTION: &str = "Provide documentation clearing outstanding compliance flags";
const GENERIC_QUESTION: &str = "Provide supporting documentation for the transaction";

fn tier_risk(input: &RiskInput) -> f64 {
    TIER_RISK[usize::from(input.amount_tier.get() - 1)]
}

fn dispute_risk(input: &RiskInput) -> f64 {
    (f64::from(input.dispute_count) * DISPUTE_STEP).min(1.0)
}

fn age_risk(input: &RiskInput) -> f64 {
    match input.age_days {
        0 => 0.6,
        d if d > 90 => 0.8,
        d if d > 30 => 0.3,
        _ => 0.1,
    }
}

fn flag_risk(input: &RiskInput) -> f64 {
    (f64::from(input.compliance_flag_count) * FLAG_STEP).min(1.0)
}

fn participant_risk(input: &RiskInput) -> f64 {
    match input.participant_count {
        n if n > 5 => 0.5,
        n if n > 2 => 0.2,
        _ => 0.1,
    }
}

fn recommend_for_score(score: RiskScore, input: &RiskInput) -> RiskRecommendation {
    let s = score.value();
    if s <= RELEASE_CEILING {
        RiskRecommendation::Release
    } else if s <= INFO_CEILING {
        RiskRecommendation::RequestAdditionalInfo {
            questions: questions_for(input),
        }
    } else if s <= HOLD_CEILING {
        RiskRecommendation::Hold {
            reason: format!("risk score {score} is in the hold band ({INFO_CEILING}, {HOLD_CEILING}]"),
        }
    } else {
        RiskRecommendation::Escalate {
            to: EscalationTarget::Management,
            urgency: Priority::High,
        }
    }
}

fn questions_for(input: &RiskInput) -> Vec<String> {
    let mut questions = Vec::new();
    if input.dispute_count > 0 {
        questions.push(DISPUTE_QUESTION.to_string());
    }
    if input.compliance_flag_count > 0 {
        questions.push(FLAG_QUESTION.to_string());
    }
    if input.age_days == 0 {
        questions.push(NEW_ACCOUNT_QUESTION.to_string());
    }
    if input.amount_tier.at_least(FALLBACK_INFO_TIER) {
        questions.push(SOURCE_OF_FUNDS_QUESTION.to_string());
    }
    if questions.is_empty() {
        questions.push(GENERIC_QUESTION.to_string());
    }
    questions
}

/// Confidence rises from [`SCORED_BASE_CONFIDENCE`] to 1.0 as the score moves
/// away from the nearest decision boundary.
fn scored_confidence(score: RiskScore) -> Confidence {
    let s = score.value();
    let distance = [RELEASE_CEILING, INFO_CEILING, HOLD_CEILING]
        .iter()
        .map(|b| (s - b).abs())
        .fold(f64::INFINITY, f64::min);
    let headroom = (distance / BOUNDARY_MARGIN).min(1.0);
    Confidence::new(SCORED_BASE_CONFIDENCE + (1.0 - SCORED_BASE_CONFIDENCE) * headroom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::AmountTier;

    fn input(tier: u8) -> RiskInput {
        RiskInput::nominal(AmountTier::new(tier).unwrap())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn nominal_low_tier_releases() {
        let a = RiskScorer::new().assess(&input(1));
        // 0.3·0.1 + 0.2·0.1 = 0.05
        assert!(approx(a.overall_risk().value(), 0.05));
        assert_eq!(a.risk_category(), RiskCategory::Low);
        assert_eq!(a.recommended_action(), &RiskRecommendation::Release);
    }

    #[test]
    fn tier_five_always_escalates_to_management() {
        let scorer = RiskScorer::new();
        let expected = RiskRecommendation::Escalate {
            to: EscalationTarget::Management,
            urgency: Priority::High,
        };
        assert_eq!(scorer.assess(&input(5)).recommended_action(), &expected);

        let mut noisy = input(5);
        noisy.dispute_count = 9;
        noisy.age_days = 0;
        noisy.milestone_backed = true;
        assert_eq!(scorer.assess(&noisy).recommended_action(), &expected);
    }

    #[test]
    fn info_band_requests_additional_info() {
        let mut i = input(4);
        i.dispute_count = 1;
        i.age_days = 45;
        let a = RiskScorer::new().assess(&i);
        // 0.21 + 0.06 + 0.06 = 0.33
        assert!(approx(a.overall_risk().value(), 0.33));
        assert_eq!(a.risk_category(), RiskCategory::Medium);
        match a.recommended_action() {
            RiskRecommendation::RequestAdditionalInfo { questions } => {
                assert!(questions.iter().any(|q| q == DISPUTE_QUESTION));
                assert!(questions.iter().any(|q| q == SOURCE_OF_FUNDS_QUESTION));
            }
            other => panic!("expected RequestAdditionalInfo, got {other:?}"),
        }
    }

    #[test]
    fn hold_band_holds() {
        let mut i = input(4);
        i.dispute_count = 3;
        i.age_days = 100;
        i.compliance_flag_count = 1;
        let a = RiskScorer::new().assess(&i);
        // 0.21 + 0.18 + 0.16 + 0.06 = 0.61
        assert!(approx(a.overall_risk().value(), 0.61));
        assert!(matches!(a.recommended_action(), RiskRecommendation::Hold { .. }));
    }

    #[test]
    fn very_high_score_escalates() {
        let mut i = input(4);
        i.dispute_count = 5;
        i.age_days = 0;
        i.compliance_flag_count = 4;
        let a = RiskScorer::new().assess(&i);
        // 0.21 + 0.3 + 0.12 + 0.2 = 0.83
        assert!(approx(a.overall_risk().value(), 0.83));
        assert_eq!(a.risk_category(), RiskCategory::High);
        assert!(matches!(a.recommended_action(), RiskRecommendation::Escalate { .. }));
    }

    #[test]
    fn milestone_mitigation_is_recorded_and_clamped() {
        let mut i = input(1);
        i.milestone_backed = true;
        let a = RiskScorer::new().assess(&i);
        assert_eq!(a.mitigating_factors().len(), 1);
        assert_eq!(a.mitigating_factors()[0].name, "milestone_backed");
        assert!(a.overall_risk().value() >= 0.0);
        assert!(a.overall_risk().value() < 0.01);
    }

    #[test]
    fn participant_complexity_is_audit_only() {
        let mut many = input(2);
        many.participant_count = 9;
        let few = input(2);
        let scorer = RiskScorer::new();
        let a = scorer.assess(&many);
        let b = scorer.assess(&few);
        assert_eq!(a.overall_risk(), b.overall_risk());
        let factor = a
            .risk_factors()
            .iter()
            .find(|f| f.name == "participant_complexity")
            .unwrap();
        assert!(approx(factor.score, 0.5));
        assert!(approx(factor.weight, 0.0));
    }

    #[test]
    fn confidence_lowest_on_boundary() {
        assert!(approx(scored_confidence(RiskScore::new(0.3)).value(), SCORED_BASE_CONFIDENCE));
        assert!(approx(scored_confidence(RiskScore::new(0.0)).value(), 1.0));
    }

    #[test]
    fn fallback_rules_in_order() {
        let scorer = RiskScorer::new();
        assert!(matches!(
            scorer.fallback(&input(5)).recommendation,
            RiskRecommendation::Escalate { to: EscalationTarget::Management, urgency: Priority::High }
        ));

        let mut disputed = input(1);
        disputed.dispute_count = 3;
        assert_eq!(
            scorer.fallback(&disputed).recommendation,
            RiskRecommendation::RequestAdditionalInfo {
                questions: vec![DISPUTE_QUESTION.to_string()]
            }
        );

        assert!(matches!(
            scorer.fallback(&input(3)).recommendation,
            RiskRecommendation::RequestAdditionalInfo { .. }
        ));
        assert_eq!(scorer.fallback(&input(2)).recommendation, RiskRecommendation::Release);
        assert_eq!(scorer.fallback(&input(2)).confidence, Confidence::CERTAIN);
    }

    #[test]
    fn deserialized_assessment_recomputes_category() {
        let json = serde_json::json!({
            "overall_risk": 0.95,
            "risk_category": "low",
            "recommended_action": {"type": "release"},
            "confidence": 0.8
        });
        let a: RiskAssessment = serde_json::from_value(json).unwrap();
        assert_eq!(a.risk_category(), RiskCategory::Critical);
    }

    #[test]
    fn recommendation_serializes_tagged() {
        let rec = RiskRecommendation::Escalate {
            to: EscalationTarget::Management,
            urgency: Priority::High,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "escalate");
        assert_eq!(json["to"], "management");
        assert_eq!(json["urgency"], "high");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use arbiter_core::AmountTier;
    use proptest::prelude::*;

    fn any_input() -> impl Strategy<Value = RiskInput> {
        (1u8..=5, 0u32..50, 0u32..400, 0u32..20, 0u32..30, any::<bool>()).prop_map(
            |(tier, disputes, age, flags, participants, milestone)| RiskInput {
                amount_tier: AmountTier::new(tier).unwrap(),
                dispute_count: disputes,
                age_days: age,
                compliance_flag_count: flags,
                participant_count: participants,
                milestone_backed: milestone,
            },
        )
    }

    proptest! {
        #[test]
        fn scores_and_confidence_in_unit_interval(i in any_input()) {
            let a = RiskScorer::new().assess(&i);
            prop_assert!((0.0..=1.0).contains(&a.overall_risk().value()));
            prop_assert!((0.0..=1.0).contains(&a.confidence().value()));
        }

        #[test]
        fn category_matches_score(i in any_input()) {
            let a = RiskScorer::new().assess(&i);
            prop_assert_eq!(a.risk_category(), a.overall_risk().category());
        }

        #[test]
        fn fallback_is_deterministic(i in any_input()) {
            let scorer = RiskScorer::new();
            let first = scorer.fallback(&i);
            let second = scorer.fallback(&i);
            prop_assert_eq!(first.confidence, Confidence::CERTAIN);
            prop_assert_eq!(first, second);
        }
    }
}
