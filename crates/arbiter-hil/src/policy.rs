//! # Escalation and SLA Policy
//!
//! Tunable thresholds for the escalation gate and the review SLA table.
//! Both deserialize with every field defaulted, so a partial configuration
//! file only overrides what it names.
//!
//! ```text
//! adjusted SLA = base(urgency) × multiplier(business impact)
//!
//!   urgency   base        impact    multiplier
//!   critical  15 min      critical  × 0.5
//!   high      60 min      high      × 0.75
//!   medium    240 min     medium    × 1
//!   low       1440 min    low       × 2
//! ```

use arbiter_core::{BusinessImpact, Confidence, Priority, ValidationError};
use serde::{Deserialize, Serialize};

/// Confidence thresholds used by the escalation gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationThresholds {
    /// Combined confidence below this escalates as low confidence.
    pub low_confidence: f64,
    /// Low-confidence escalations below this are high urgency.
    pub very_low_confidence: f64,
    /// Compliance confidence below this escalates to compliance.
    pub compliance_confidence: f64,
}

impl Default for EscalationThresholds {
    fn default() -> Self {
        Self {
            low_confidence: 0.6,
            very_low_confidence: 0.3,
            compliance_confidence: 0.5,
        }
    }
}

impl EscalationThresholds {
    /// `true` if `c` is below the low-confidence threshold.
    pub fn is_low(&self, c: Confidence) -> bool {
        c.value() < self.low_confidence
    }

    /// `true` if `c` is below the very-low-confidence threshold.
    pub fn is_very_low(&self, c: Confidence) -> bool {
        c.value() < self.very_low_confidence
    }

    /// `true` if `c` is below the compliance threshold.
    pub fn is_low_compliance(&self, c: Confidence) -> bool {
        c.value() < self.compliance_confidence
    }

    /// Thresholds must lie in `[0, 1]` and very-low must not exceed low.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("escalation.low_confidence", self.low_confidence),
            ("escalation.very_low_confidence", self.very_low_confidence),
            ("escalation.compliance_confidence", self.compliance_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::InvalidField {
                    field,
                    reason: format!("{value} is outside [0, 1]"),
                });
            }
        }
        if self.very_low_confidence > self.low_confidence {
            return Err(ValidationError::InvalidField {
                field: "escalation.very_low_confidence",
                reason: "must not exceed escalation.low_confidence".into(),
            });
        }
        Ok(())
    }
}

/// Business-impact multipliers applied to the base SLA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactMultipliers {
    /// Critical impact.
    pub critical: f64,
    /// High impact.
    pub high: f64,
    /// Medium impact.
    pub medium: f64,
    /// Low impact.
    pub low: f64,
}

impl Default for ImpactMultipliers {
    fn default() -> Self {
        Self {
            critical: 0.5,
            high: 0.75,
            medium: 1.0,
            low: 2.0,
        }
    }
}

/// Base review SLA per urgency, in minutes, plus impact scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaPolicy {
    /// Critical urgency.
    pub critical_minutes: u32,
    /// High urgency.
    pub high_minutes: u32,
    /// Medium urgency.
    pub medium_minutes: u32,
    /// Low urgency.
    pub low_minutes: u32,
    /// Impact multipliers.
    pub impact: ImpactMultipliers,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            critical_minutes: 15,
            high_minutes: 60,
            medium_minutes: 240,
            low_minutes: 1440,
            impact: ImpactMultipliers::default(),
        }
    }
}

impl SlaPolicy {
    /// Base SLA for an urgency, in minutes.
    pub fn base_minutes(&self, urgency: Priority) -> u32 {
        match urgency {
            Priority::Critical => self.critical_minutes,
            Priority::High => self.high_minutes,
            Priority::Medium => self.medium_minutes,
            Priority::Low => self.low_minutes,
        }
    }

    /// Multiplier for a business impact.
    pub fn multiplier(&self, impact: BusinessImpact) -> f64 {
        match impact {
            BusinessImpact::Critical => self.impact.critical,
            BusinessImpact::High => self.impact.high,
            BusinessImpact::Medium => self.impact.medium,
            BusinessImpact::Low => self.impact.low,
        }
    }

    /// Adjusted SLA in whole seconds, never less than one.
    pub fn adjusted_seconds(&self, urgency: Priority, impact: BusinessImpact) -> i64 {
        let base = i64::from(self.base_minutes(urgency)) * 60;
        ((base as f64 * self.multiplier(impact)).round() as i64).max(1)
    }

    /// Every base must be positive and every multiplier in `(0, 10]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, minutes) in [
            ("sla.critical_minutes", self.critical_minutes),
            ("sla.high_minutes", self.high_minutes),
            ("sla.medium_minutes", self.medium_minutes),
            ("sla.low_minutes", self.low_minutes),
        ] {
            if minutes == 0 {
                return Err(ValidationError::InvalidField {
                    field,
                    reason: "must be at least one minute".into(),
                });
            }
        }
        for (field, m) in [
            ("sla.impact.critical", self.impact.critical),
            ("sla.impact.high", self.impact.high),
            ("sla.impact.medium", self.impact.medium),
            ("sla.impact.low", self.impact.low),
        ] {
            if !(m > 0.0 && m <= 10.0) {
                return Err(ValidationError::InvalidField {
                    field,
                    reason: format!("{m} is outside (0, 10]"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table() {
        let p = SlaPolicy::default();
        assert_eq!(p.adjusted_seconds(Priority::Critical, BusinessImpact::Medium), 15 * 60);
        assert_eq!(p.adjusted_seconds(Priority::High, BusinessImpact::Medium), 60 * 60);
        assert_eq!(p.adjusted_seconds(Priority::Medium, BusinessImpact::Medium), 240 * 60);
        assert_eq!(p.adjusted_seconds(Priority::Low, BusinessImpact::Medium), 1440 * 60);
    }

    #[test]
    fn impact_scaling() {
        let p = SlaPolicy::default();
        assert_eq!(p.adjusted_seconds(Priority::High, BusinessImpact::Critical), 30 * 60);
        assert_eq!(p.adjusted_seconds(Priority::Critical, BusinessImpact::High), 675);
        assert_eq!(p.adjusted_seconds(Priority::Medium, BusinessImpact::Low), 480 * 60);
    }

    #[test]
    fn tiny_multiplier_still_leaves_a_second() {
        let mut p = SlaPolicy::default();
        p.impact.critical = 0.001;
        assert!(p.validate().is_ok());
        // 15 minutes * 0.001 = 0.9s, which would otherwise round to zero.
        assert_eq!(p.adjusted_seconds(Priority::Critical, BusinessImpact::Critical), 1);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let p: SlaPolicy = serde_json::from_str(r#"{"critical_minutes": 5}"#).unwrap();
        assert_eq!(p.critical_minutes, 5);
        assert_eq!(p.medium_minutes, 240);
        assert_eq!(p.impact.low, 2.0);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let p = SlaPolicy {
            high_minutes: 0,
            ..SlaPolicy::default()
        };
        assert!(p.validate().is_err());

        let mut p = SlaPolicy::default();
        p.impact.low = -1.0;
        assert!(p.validate().is_err());

        let t = EscalationThresholds {
            very_low_confidence: 0.9,
            ..EscalationThresholds::default()
        };
        assert!(t.validate().is_err());
        assert!(EscalationThresholds::default().validate().is_ok());
        assert!(SlaPolicy::default().validate().is_ok());
    }

    #[test]
    fn threshold_predicates() {
        let t = EscalationThresholds::default();
        assert!(t.is_low(Confidence::new(0.55)));
        assert!(!t.is_low(Confidence::new(0.6)));
        assert!(t.is_very_low(Confidence::new(0.29)));
        assert!(t.is_low_compliance(Confidence::new(0.49)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn urgency() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::Low),
            Just(Priority::Medium),
            Just(Priority::High),
            Just(Priority::Critical),
        ]
    }

    fn impact() -> impl Strategy<Value = BusinessImpact> {
        prop_oneof![
            Just(BusinessImpact::Low),
            Just(BusinessImpact::Medium),
            Just(BusinessImpact::High),
            Just(BusinessImpact::Critical),
        ]
    }

    proptest! {
        #[test]
        fn valid_policy_yields_positive_sla(
            minutes in 1u32..10_000,
            multiplier in 1e-9f64..=10.0,
            u in urgency(),
            i in impact(),
        ) {
            let policy = SlaPolicy {
                critical_minutes: minutes,
                high_minutes: minutes,
                medium_minutes: minutes,
                low_minutes: minutes,
                impact: ImpactMultipliers {
                    critical: multiplier,
                    high: multiplier,
                    medium: multiplier,
                    low: multiplier,
                },
            };
            prop_assert!(policy.validate().is_ok());
            prop_assert!(policy.adjusted_seconds(u, i) > 0);
        }

        #[test]
        fn more_urgent_never_gets_longer_sla(i in impact()) {
            let p = SlaPolicy::default();
            prop_assert!(p.adjusted_seconds(Priority::Critical, i) <= p.adjusted_seconds(Priority::High, i));
            prop_assert!(p.adjusted_seconds(Priority::High, i) <= p.adjusted_seconds(Priority::Medium, i));
            prop_assert!(p.adjusted_seconds(Priority::Medium, i) <= p.adjusted_seconds(Priority::Low, i));
        }
    }
}
