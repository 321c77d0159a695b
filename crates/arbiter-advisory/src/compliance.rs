//! # Compliance Engine
//!
//! Two independent strategies over the same [`ComplianceRequest`]:
//!
//! - **Scored**: ordered checks, each with its own confidence.
//! - **Rules**: fixed deterministic rules, confidence always 1.0.
//!
//! When both yield the same decision type the scored result is used
//! unmodified. When they disagree the [`TieBreaker`] settles it with a fixed
//! hierarchy: any reject wins, then any review, then high-value conservatism,
//! then low-value permissiveness.
//!
//! The overall confidence reported to callers blends the two strategies
//! `0.4 · scored + 0.6 · rules`. The fallback entry point skips the scored
//! strategy and returns the rules result at confidence 1.0.

use arbiter_core::{
    AmountTier, ComplianceRequest, Confidence, RiskProfile, SanctionsStatus, VerificationLevel,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

/// Scored strategy: blocked sanctions.
pub const SCORED_BLOCKED: f64 = 0.99;
/// Scored strategy: flagged sanctions.
pub const SCORED_FLAGGED: f64 = 0.95;
/// Scored strategy: sanctions screening still under review.
pub const SCORED_UNDER_REVIEW: f64 = 0.90;
/// Scored strategy: critical risk profile.
pub const SCORED_CRITICAL_PROFILE: f64 = 0.90;
/// Scored strategy: high risk profile.
pub const SCORED_HIGH_PROFILE: f64 = 0.85;
/// Scored strategy: high-value amount with insufficient verification.
pub const SCORED_INSUFFICIENT_VERIFICATION: f64 = 0.80;
/// Scored strategy: compliance flags present.
pub const SCORED_FLAGS: f64 = 0.75;
/// Scored strategy: many jurisdictions.
pub const SCORED_MULTI_JURISDICTION: f64 = 0.70;
/// Scored strategy: nothing found.
pub const SCORED_APPROVE: f64 = 0.85;

/// Tier at or above which the scored strategy requires standard verification.
pub const SCORED_VERIFICATION_TIER: u8 = 4;
/// Jurisdiction count above which the scored strategy asks for review.
pub const JURISDICTION_LIMIT: u32 = 2;
/// Tier at or above which the rules strategy requires enhanced verification.
pub const RULES_ENHANCED_TIER: u8 = 5;
/// Tier at or above which the rules strategy rejects unverified participants.
pub const RULES_VERIFIED_TIER: u8 = 3;

/// Weight of the scored confidence in the overall confidence.
pub const SCORED_BLEND_WEIGHT: f64 = 0.4;
/// Weight of the rules confidence in the overall confidence.
pub const RULES_BLEND_WEIGHT: f64 = 0.6;

/// Tie-breaker confidence ceiling: reject.
pub const TIE_REJECT_CONFIDENCE: f64 = 0.95;
/// Tie-breaker confidence ceiling: review.
pub const TIE_REVIEW_CONFIDENCE: f64 = 0.85;
/// Tie-breaker confidence ceiling: high-value review.
pub const TIE_HIGH_VALUE_CONFIDENCE: f64 = 0.80;
/// Tie-breaker confidence ceiling: low-value approve.
pub const TIE_APPROVE_CONFIDENCE: f64 = 0.75;
/// Tier at or above which disagreements resolve to review.
pub const TIE_HIGH_VALUE_TIER: u8 = 4;

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// The decision type of a compliance recommendation, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceDecision {
    /// Approve.
    Approve,
    /// Reject.
    Reject,
    /// Require human review.
    RequireReview,
    /// Request documentation.
    RequestDocumentation,
}

impl ComplianceDecision {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::RequireReview => "require_review",
            Self::RequestDocumentation => "request_documentation",
        }
    }
}

impl std::fmt::Display for ComplianceDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compliance recommendation. The confidence is carried inside the
/// variant so decision and confidence are always produced together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ComplianceRecommendation {
    /// Approve; `checks` lists what passed.
    Approve {
        /// Confidence.
        confidence: Confidence,
        /// Checks that passed.
        checks: Vec<String>,
    },
    /// Reject.
    Reject {
        /// Confidence.
        confidence: Confidence,
        /// Violations found.
        violations: Vec<String>,
    },
    /// Require human review.
    RequireReview {
        /// Confidence.
        confidence: Confidence,
        /// Concerns to review.
        concerns: Vec<String>,
    },
    /// Request documentation before deciding.
    RequestDocumentation {
        /// Confidence.
        confidence: Confidence,
        /// Documents required.
        requirements: Vec<String>,
    },
}

impl ComplianceRecommendation {
    fn approve(confidence: f64, checks: &[&str]) -> Self {
        Self::Approve {
            confidence: Confidence::new(confidence),
            checks: owned(checks),
        }
    }

    fn reject(confidence: f64, violations: &[&str]) -> Self {
        Self::Reject {
            confidence: Confidence::new(confidence),
            violations: owned(violations),
        }
    }

    fn review(confidence: f64, concerns: Vec<String>) -> Self {
        Self::RequireReview {
            confidence: Confidence::new(confidence),
            concerns,
        }
    }

    fn documentation(confidence: f64, requirements: &[&str]) -> Self {
        Self::RequestDocumentation {
            confidence: Confidence::new(confidence),
            requirements: owned(requirements),
        }
    }

    /// The decision type.
    pub fn decision(&self) -> ComplianceDecision {
        match self {
            Self::Approve { .. } => ComplianceDecision::Approve,
            Self::Reject { .. } => ComplianceDecision::Reject,
            Self::RequireReview { .. } => ComplianceDecision::RequireReview,
            Self::RequestDocumentation { .. } => ComplianceDecision::RequestDocumentation,
        }
    }

    /// The confidence carried by the variant.
    pub fn confidence(&self) -> Confidence {
        match self {
            Self::Approve { confidence, .. }
            | Self::Reject { confidence, .. }
            | Self::RequireReview { confidence, .. }
            | Self::RequestDocumentation { confidence, .. } => *confidence,
        }
    }

    /// Checks, violations, concerns, or requirements.
    pub fn details(&self) -> &[String] {
        match self {
            Self::Approve { checks, .. } => checks,
            Self::Reject { violations, .. } => violations,
            Self::RequireReview { concerns, .. } => concerns,
            Self::RequestDocumentation { requirements, .. } => requirements,
        }
    }

    /// The same recommendation at a different confidence.
    pub fn with_confidence(self, confidence: Confidence) -> Self {
        match self {
            Self::Approve { checks, .. } => Self::Approve { confidence, checks },
            Self::Reject { violations, .. } => Self::Reject {
                confidence,
                violations,
            },
            Self::RequireReview { concerns, .. } => Self::RequireReview {
                confidence,
                concerns,
            },
            Self::RequestDocumentation { requirements, .. } => Self::RequestDocumentation {
                confidence,
                requirements,
            },
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tie-breaker
// ---------------------------------------------------------------------------

/// How a disagreement between the two strategies was settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieBreakerResult {
    /// Which decisions disagreed, e.g. `scored=approve, rules=require_review`.
    pub conflict_reason: String,
    /// The settled decision type.
    pub resolution: ComplianceDecision,
    /// The hierarchy rule that decided it.
    pub deciding_factor: String,
    /// Confidence of the settled decision.
    pub confidence: Confidence,
}

/// Fixed-priority resolution of scored-vs-rules disagreements.
#[derive(Debug, Clone, Copy, Default)]
pub struct TieBreaker;

impl TieBreaker {
    /// Resolve two strategy outputs.
    ///
    /// Returns the scored recommendation unmodified and no
    /// [`TieBreakerResult`] when the decision types match. Otherwise the
    /// settled recommendation carries `min(ceiling, mean(scored, rules))`
    /// as its confidence, where the ceiling is set by the deciding rule.
    pub fn resolve(
        scored: &ComplianceRecommendation,
        rules: &ComplianceRecommendation,
        amount_tier: AmountTier,
    ) -> (ComplianceRecommendation, Option<TieBreakerResult>) {
        if scored.decision() == rules.decision() {
            return (scored.clone(), None);
        }

        let either = |d: ComplianceDecision| scored.decision() == d || rules.decision() == d;
        let (resolution, factor, ceiling) = if either(ComplianceDecision::Reject) {
            (ComplianceDecision::Reject, "safety_first_principle", TIE_REJECT_CONFIDENCE)
        } else if either(ComplianceDecision::RequireReview) {
            (ComplianceDecision::RequireReview, "caution_principle", TIE_REVIEW_CONFIDENCE)
        } else if amount_tier.at_least(TIE_HIGH_VALUE_TIER) {
            (
                ComplianceDecision::RequireReview,
                "high_value_conservatism",
                TIE_HIGH_VALUE_CONFIDENCE,
            )
        } else {
            (ComplianceDecision::Approve, "low_value_permissive", TIE_APPROVE_CONFIDENCE)
        };

        let mean = Confidence::blend(scored.confidence(), 0.5, rules.confidence(), 0.5);
        let confidence = mean.min(Confidence::new(ceiling));

        let mut details: Vec<String> = Vec::new();
        for item in scored.details().iter().chain(rules.details()) {
            if !details.contains(item) {
                details.push(item.clone());
            }
        }
        let settled = match resolution {
            ComplianceDecision::Reject => ComplianceRecommendation::Reject {
                confidence,
                violations: details,
            },
            ComplianceDecision::RequireReview => ComplianceRecommendation::RequireReview {
                confidence,
                concerns: details,
            },
            // Only Approve reaches here; documentation is never a tie outcome.
            ComplianceDecision::Approve | ComplianceDecision::RequestDocumentation => {
                ComplianceRecommendation::Approve {
                    confidence,
                    checks: details,
                }
            }
        };

        let result = TieBreakerResult {
            conflict_reason: format!("scored={}, rules={}", scored.decision(), rules.decision()),
            resolution,
            deciding_factor: factor.to_string(),
            confidence,
        };
        tracing::debug!(
            conflict = %result.conflict_reason,
            resolution = %resolution,
            deciding_factor = factor,
            "compliance tie-breaker applied"
        );
        (settled, Some(result))
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Result of a compliance check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResponse {
    /// The settled recommendation.
    pub recommendation: ComplianceRecommendation,
    /// Scored strategy output; absent on the fallback path.
    pub scored: Option<ComplianceRecommendation>,
    /// Rules strategy output.
    pub rules: ComplianceRecommendation,
    /// Present only when the strategies disagreed.
    pub tie_breaker: Option<TieBreakerResult>,
    /// `0.4 · scored + 0.6 · rules`, or 1.0 on the fallback path.
    pub overall_confidence: Confidence,
    /// Whether the scored strategy was skipped.
    pub fallback_used: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless compliance engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceEngine;

impl ComplianceEngine {
    /// Create an engine.
    pub fn new() -> Self {
        Self
    }

    /// Scored strategy. First matching check wins.
    pub fn scored(&self, req: &ComplianceRequest) -> ComplianceRecommendation {
        use ComplianceRecommendation as R;
        match req.sanctions {
            SanctionsStatus::Blocked => return R::reject(SCORED_BLOCKED, &["sanctions_blocked"]),
            SanctionsStatus::Flagged => {
                return R::review(SCORED_FLAGGED, owned(&["sanctions_flagged"]))
            }
            SanctionsStatus::UnderReview => {
                return R::review(SCORED_UNDER_REVIEW, owned(&["sanctions_under_review"]))
            }
            SanctionsStatus::Clear => {}
        }
        match req.risk_profile {
            RiskProfile::Critical => {
                return R::reject(SCORED_CRITICAL_PROFILE, &["critical_risk_profile"])
            }
            RiskProfile::High => return R::review(SCORED_HIGH_PROFILE, owned(&["high_risk_profile"])),
            RiskProfile::Low | RiskProfile::Medium => {}
        }
        if req.amount_tier.at_least(SCORED_VERIFICATION_TIER)
            && req.verification < VerificationLevel::Standard
        {
            return R::documentation(SCORED_INSUFFICIENT_VERIFICATION, &["standard_verification"]);
        }
        if !req.compliance_flags.is_empty() {
            return R::review(SCORED_FLAGS, req.compliance_flags.clone());
        }
        if req.jurisdiction_count > JURISDICTION_LIMIT {
            return R::review(SCORED_MULTI_JURISDICTION, owned(&["multi_jurisdiction"]));
        }
        R::approve(
            SCORED_APPROVE,
            &["sanctions_clear", "risk_profile_acceptable", "verification_sufficient"],
        )
    }

    /// Rules strategy. Deterministic, confidence always 1.0.
    pub fn rules(&self, req: &ComplianceRequest) -> ComplianceRecommendation {
        use ComplianceRecommendation as R;
        if req.sanctions == SanctionsStatus::Blocked {
            R::reject(1.0, &["sanctions_blocked"])
        } else if req.risk_profile == RiskProfile::Critical {
            R::reject(1.0, &["critical_risk_profile"])
        } else if req.amount_tier.at_least(RULES_ENHANCED_TIER)
            && req.verification != VerificationLevel::Enhanced
        {
            R::documentation(1.0, &["enhanced_verification"])
        } else if req.sanctions == SanctionsStatus::Flagged {
            R::review(1.0, owned(&["sanctions_flagged"]))
        } else if req.verification == VerificationLevel::Unverified
            && req.amount_tier.at_least(RULES_VERIFIED_TIER)
        {
            R::documentation(1.0, &["identity_verification"])
        } else {
            R::approve(1.0, &["rules_passed"])
        }
    }

    /// Run both strategies and settle.
    pub fn check(&self, req: &ComplianceRequest) -> ComplianceResponse {
        let scored = self.scored(req);
        self.settle(scored, req)
    }

    /// Settle an externally produced scored recommendation against the
    /// rules strategy for the same request.
    pub fn settle(
        &self,
        scored: ComplianceRecommendation,
        req: &ComplianceRequest,
    ) -> ComplianceResponse {
        let rules = self.rules(req);
        let (recommendation, tie_breaker) = TieBreaker::resolve(&scored, &rules, req.amount_tier);
        let overall_confidence = Confidence::blend(
            scored.confidence(),
            SCORED_BLEND_WEIGHT,
            rules.confidence(),
            RULES_BLEND_WEIGHT,
        );
        tracing::debug!(
            scored = %scored.decision(),
            rules = %rules.decision(),
            settled = %recommendation.decision(),
            overall_confidence = overall_confidence.value(),
            "compliance checked"
        );
        ComplianceResponse {
            recommendation,
            scored: Some(scored),
            rules,
            tie_breaker,
            overall_confidence,
            fallback_used: false,
        }
    }

    /// Rules-only path.
    pub fn check_fallback(&self, req: &ComplianceRequest) -> ComplianceResponse {
        let rules = self.rules(req);
        ComplianceResponse {
            recommendation: rules.clone().with_confidence(Confidence::CERTAIN),
            scored: None,
            rules,
            tie_breaker: None,
            overall_confidence: Confidence::CERTAIN,
            fallback_used: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(t: u8) -> AmountTier {
        AmountTier::new(t).unwrap()
    }

    fn request(t: u8) -> ComplianceRequest {
        ComplianceRequest::nominal(tier(t))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn clean_request_approves_without_tie_break() {
        let resp = ComplianceEngine::new().check(&request(2));
        assert_eq!(resp.recommendation.decision(), ComplianceDecision::Approve);
        assert!(resp.tie_breaker.is_none());
        // Matching types keep the scored confidence.
        assert!(approx(resp.recommendation.confidence().value(), SCORED_APPROVE));
        // 0.4 · 0.85 + 0.6 · 1.0
        assert!(approx(resp.overall_confidence.value(), 0.94));
    }

    #[test]
    fn blocked_sanctions_reject_on_every_path() {
        let mut req = request(1);
        req.sanctions = SanctionsStatus::Blocked;
        let engine = ComplianceEngine::new();
        assert_eq!(engine.scored(&req).decision(), ComplianceDecision::Reject);
        assert_eq!(engine.rules(&req).decision(), ComplianceDecision::Reject);
        assert_eq!(engine.check(&req).recommendation.decision(), ComplianceDecision::Reject);
        assert_eq!(
            engine.check_fallback(&req).recommendation.decision(),
            ComplianceDecision::Reject
        );
    }

    #[test]
    fn scored_checks_in_order() {
        let engine = ComplianceEngine::new();

        let mut req = request(1);
        req.sanctions = SanctionsStatus::UnderReview;
        req.risk_profile = RiskProfile::Critical;
        let rec = engine.scored(&req);
        assert_eq!(rec.decision(), ComplianceDecision::RequireReview);
        assert!(approx(rec.confidence().value(), SCORED_UNDER_REVIEW));

        let mut req = request(4);
        req.verification = VerificationLevel::Basic;
        req.compliance_flags = vec!["pep_match".into()];
        let rec = engine.scored(&req);
        assert_eq!(rec.decision(), ComplianceDecision::RequestDocumentation);

        let mut req = request(2);
        req.compliance_flags = vec!["pep_match".into()];
        let rec = engine.scored(&req);
        assert_eq!(rec.details(), ["pep_match".to_string()]);
        assert!(approx(rec.confidence().value(), SCORED_FLAGS));

        let mut req = request(2);
        req.jurisdiction_count = 3;
        assert!(approx(engine.scored(&req).confidence().value(), SCORED_MULTI_JURISDICTION));
    }

    #[test]
    fn rules_require_enhanced_verification_at_tier_five() {
        let engine = ComplianceEngine::new();
        let rec = engine.rules(&request(5));
        assert_eq!(rec.decision(), ComplianceDecision::RequestDocumentation);
        assert_eq!(rec.confidence(), Confidence::CERTAIN);

        let mut req = request(5);
        req.verification = VerificationLevel::Enhanced;
        assert_eq!(engine.rules(&req).decision(), ComplianceDecision::Approve);
    }

    #[test]
    fn rules_reject_unverified_mid_tier() {
        let mut req = request(3);
        req.verification = VerificationLevel::Unverified;
        let rec = ComplianceEngine::new().rules(&req);
        assert_eq!(rec.details(), ["identity_verification".to_string()]);
    }

    #[test]
    fn tie_breaker_caution_principle() {
        let scored = ComplianceRecommendation::approve(0.85, &["sanctions_clear"]);
        let rules = ComplianceRecommendation::review(0.75, owned(&["sanctions_flagged"]));
        let (rec, result) = TieBreaker::resolve(&scored, &rules, tier(2));
        let result = result.unwrap();
        assert_eq!(rec.decision(), ComplianceDecision::RequireReview);
        assert_eq!(result.deciding_factor, "caution_principle");
        assert!(approx(result.confidence.value(), 0.8));
        assert!(approx(rec.confidence().value(), 0.8));
    }

    #[test]
    fn tie_breaker_safety_first() {
        let scored = ComplianceRecommendation::review(0.9, owned(&["x"]));
        let rules = ComplianceRecommendation::reject(1.0, &["critical_risk_profile"]);
        let (rec, result) = TieBreaker::resolve(&scored, &rules, tier(1));
        assert_eq!(rec.decision(), ComplianceDecision::Reject);
        let result = result.unwrap();
        assert_eq!(result.deciding_factor, "safety_first_principle");
        assert!(approx(result.confidence.value(), 0.95));
        assert_eq!(result.conflict_reason, "scored=require_review, rules=reject");
    }

    #[test]
    fn tie_breaker_value_split() {
        let scored = ComplianceRecommendation::approve(1.0, &[]);
        let rules = ComplianceRecommendation::documentation(1.0, &["enhanced_verification"]);

        let (rec, result) = TieBreaker::resolve(&scored, &rules, tier(4));
        assert_eq!(rec.decision(), ComplianceDecision::RequireReview);
        assert_eq!(result.unwrap().deciding_factor, "high_value_conservatism");
        assert!(approx(rec.confidence().value(), 0.80));

        let (rec, result) = TieBreaker::resolve(&scored, &rules, tier(3));
        assert_eq!(rec.decision(), ComplianceDecision::Approve);
        assert_eq!(result.unwrap().deciding_factor, "low_value_permissive");
        assert!(approx(rec.confidence().value(), 0.75));
    }

    #[test]
    fn disagreement_in_check_produces_tie_breaker() {
        // Scored asks for documentation (tier 4, basic); rules approve.
        let mut req = request(4);
        req.verification = VerificationLevel::Basic;
        let resp = ComplianceEngine::new().check(&req);
        let tb = resp.tie_breaker.expect("strategies disagree");
        assert_eq!(tb.deciding_factor, "high_value_conservatism");
        assert_eq!(resp.recommendation.decision(), ComplianceDecision::RequireReview);
    }

    #[test]
    fn fallback_uses_rules_at_full_confidence() {
        let resp = ComplianceEngine::new().check_fallback(&request(5));
        assert!(resp.fallback_used);
        assert!(resp.scored.is_none());
        assert_eq!(resp.overall_confidence, Confidence::CERTAIN);
        assert_eq!(
            resp.recommendation.decision(),
            ComplianceDecision::RequestDocumentation
        );
    }

    #[test]
    fn recommendation_serializes_with_decision_tag() {
        let rec = ComplianceRecommendation::reject(0.99, &["sanctions_blocked"]);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["decision"], "reject");
        assert_eq!(json["violations"][0], "sanctions_blocked");
    }
}
