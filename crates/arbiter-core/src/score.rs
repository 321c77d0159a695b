//! # Clamped Scores
//!
//! [`Confidence`] and [`RiskScore`] are `f64` newtypes whose only
//! constructor clamps into `[0, 1]`. Deserialization goes through the same
//! constructor, so an out-of-range value from a collaborator is clamped on
//! the way in rather than propagated. `NaN` maps to `0.0`.

use serde::{Deserialize, Serialize};

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// A confidence value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Full confidence. Deterministic rule paths always report this.
    pub const CERTAIN: Self = Self(1.0);

    /// Zero confidence.
    pub const NONE: Self = Self(0.0);

    /// Create a confidence, clamping into `[0, 1]`.
    pub fn new(value: f64) -> Self {
        Self(clamp_unit(value))
    }

    /// The underlying value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Arithmetic mean of the given confidences, or `None` when empty.
    pub fn mean(values: &[Confidence]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().map(|c| c.0).sum();
        Some(Self::new(sum / values.len() as f64))
    }

    /// The smaller of two confidences.
    pub fn min(self, other: Self) -> Self {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }

    /// The larger of two confidences.
    pub fn max(self, other: Self) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }

    /// Scale by `factor` (e.g. `0.9` for a 10% discount), re-clamped.
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.0 * factor)
    }

    /// Weighted blend `a·wa + b·wb`, re-clamped.
    pub fn blend(a: Self, wa: f64, b: Self, wb: f64) -> Self {
        Self::new(a.0 * wa + b.0 * wb)
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RiskScore / RiskCategory
// ---------------------------------------------------------------------------

/// Upper bound (inclusive) of the `Low` category.
pub const LOW_RISK_CEILING: f64 = 0.3;
/// Upper bound (inclusive) of the `Medium` category.
pub const MEDIUM_RISK_CEILING: f64 = 0.7;
/// Upper bound (inclusive) of the `High` category. Above is `Critical`.
pub const HIGH_RISK_CEILING: f64 = 0.9;

/// An overall risk value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct RiskScore(f64);

impl RiskScore {
    /// Create a risk score, clamping into `[0, 1]`.
    pub fn new(value: f64) -> Self {
        Self(clamp_unit(value))
    }

    /// The underlying value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// The category this score falls in. The only way a [`RiskCategory`] is
    /// derived anywhere in the workspace.
    pub fn category(self) -> RiskCategory {
        if self.0 <= LOW_RISK_CEILING {
            RiskCategory::Low
        } else if self.0 <= MEDIUM_RISK_CEILING {
            RiskCategory::Medium
        } else if self.0 <= HIGH_RISK_CEILING {
            RiskCategory::High
        } else {
            RiskCategory::Critical
        }
    }
}

impl From<f64> for RiskScore {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<RiskScore> for f64 {
    fn from(r: RiskScore) -> Self {
        r.0
    }
}

impl std::fmt::Display for RiskScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Coarse risk bucket selected from a [`RiskScore`] by fixed breakpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// `score ≤ 0.3`
    Low,
    /// `0.3 < score ≤ 0.7`
    Medium,
    /// `0.7 < score ≤ 0.9`
    High,
    /// `score > 0.9`
    Critical,
}

impl RiskCategory {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_clamps_on_construction() {
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
        assert_eq!(Confidence::new(0.42).value(), 0.42);
    }

    #[test]
    fn confidence_clamps_on_deserialize() {
        let c: Confidence = serde_json::from_str("3.5").unwrap();
        assert_eq!(c, Confidence::CERTAIN);
        let c: Confidence = serde_json::from_str("-1").unwrap();
        assert_eq!(c, Confidence::NONE);
    }

    #[test]
    fn confidence_mean_and_min() {
        let a = Confidence::new(0.9);
        let b = Confidence::new(0.6);
        assert!((Confidence::mean(&[a, b]).unwrap().value() - 0.75).abs() < 1e-12);
        assert_eq!(a.min(b), b);
        assert_eq!(a.max(b), a);
        assert!(Confidence::mean(&[]).is_none());
    }

    #[test]
    fn confidence_blend_matches_weights() {
        let blended = Confidence::blend(Confidence::new(0.85), 0.4, Confidence::CERTAIN, 0.6);
        assert!((blended.value() - 0.94).abs() < 1e-12);
    }

    #[test]
    fn risk_category_breakpoints() {
        assert_eq!(RiskScore::new(0.0).category(), RiskCategory::Low);
        assert_eq!(RiskScore::new(0.3).category(), RiskCategory::Low);
        assert_eq!(RiskScore::new(0.31).category(), RiskCategory::Medium);
        assert_eq!(RiskScore::new(0.7).category(), RiskCategory::Medium);
        assert_eq!(RiskScore::new(0.75).category(), RiskCategory::High);
        assert_eq!(RiskScore::new(0.9).category(), RiskCategory::High);
        assert_eq!(RiskScore::new(0.91).category(), RiskCategory::Critical);
        assert_eq!(RiskScore::new(4.0).category(), RiskCategory::Critical);
    }

    #[test]
    fn risk_category_display() {
        assert_eq!(RiskCategory::Critical.to_string(), "critical");
        assert_eq!(RiskCategory::Low.as_str(), "low");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// No input, however wild, escapes the unit interval.
        #[test]
        fn confidence_always_in_unit_interval(v in proptest::num::f64::ANY) {
            let c = Confidence::new(v).value();
            prop_assert!((0.0..=1.0).contains(&c));
        }

        #[test]
        fn scaled_confidence_stays_in_unit_interval(v in 0.0f64..=1.0, factor in -5.0f64..5.0) {
            let c = Confidence::new(v).scaled(factor).value();
            prop_assert!((0.0..=1.0).contains(&c));
        }

        /// The category is a pure function of the score.
        #[test]
        fn category_is_deterministic(v in -1.0f64..2.0) {
            prop_assert_eq!(RiskScore::new(v).category(), RiskScore::new(v).category());
        }
    }
}
