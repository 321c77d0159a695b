//! # Advisory Payloads
//!
//! The categorical data an originating domain system (escrow, payment,
//! governance) hands to the engine. Nothing here can carry a raw amount or a
//! raw identifier: amounts are [`AmountTier`]s, identifiers are
//! [`HashedId`]s, and compliance flags are short snake_case codes.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::HashedId;
use crate::tier::AmountTier;

/// Tier at or above which an action counts as high value.
pub const HIGH_VALUE_TIER: u8 = 4;

const MAX_FLAG_LEN: usize = 64;
const MAX_FLAGS: usize = 32;
const MAX_PARTICIPANTS: usize = 256;

// ---------------------------------------------------------------------------
// Risk input
// ---------------------------------------------------------------------------

/// Escrow/transaction attributes consumed by the risk scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskInput {
    /// Bucketed amount.
    pub amount_tier: AmountTier,
    /// Prior disputes involving the participants.
    #[serde(default)]
    pub dispute_count: u32,
    /// Age of the escrow/transaction in whole days (0 = under one day).
    #[serde(default)]
    pub age_days: u32,
    /// Number of compliance flags raised against the action.
    #[serde(default)]
    pub compliance_flag_count: u32,
    /// Number of participants.
    #[serde(default = "default_participants")]
    pub participant_count: u32,
    /// Whether release is gated on milestones.
    #[serde(default)]
    pub milestone_backed: bool,
}

fn default_participants() -> u32 {
    2
}

impl RiskInput {
    /// A nominal input at the given tier: no disputes, a week old, no flags,
    /// two participants, not milestone-backed.
    pub fn nominal(amount_tier: AmountTier) -> Self {
        Self {
            amount_tier,
            dispute_count: 0,
            age_days: 7,
            compliance_flag_count: 0,
            participant_count: default_participants(),
            milestone_backed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Compliance input
// ---------------------------------------------------------------------------

/// Sanctions screening status of the participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanctionsStatus {
    /// No match.
    Clear,
    /// Potential match awaiting disposition.
    Flagged,
    /// Under active investigation.
    UnderReview,
    /// Confirmed match.
    Blocked,
}

impl SanctionsStatus {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Flagged => "flagged",
            Self::UnderReview => "under_review",
            Self::Blocked => "blocked",
        }
    }
}

/// Participant risk profile as maintained by the compliance collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    /// Low.
    Low,
    /// Medium.
    Medium,
    /// High.
    High,
    /// Critical.
    Critical,
}

impl RiskProfile {
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

/// Identity verification depth, ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    /// No verification.
    Unverified,
    /// Contact details verified.
    Basic,
    /// Government identity verified.
    Standard,
    /// Enhanced due diligence completed.
    Enhanced,
}

impl VerificationLevel {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Enhanced => "enhanced",
        }
    }
}

/// Participant/risk data consumed by both compliance strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRequest {
    /// Sanctions screening status.
    pub sanctions: SanctionsStatus,
    /// Participant risk profile.
    pub risk_profile: RiskProfile,
    /// Verification depth.
    pub verification: VerificationLevel,
    /// Compliance flag codes (snake_case, e.g. `pep_match`).
    #[serde(default)]
    pub compliance_flags: Vec<String>,
    /// Number of jurisdictions the action touches.
    #[serde(default = "default_jurisdictions")]
    pub jurisdiction_count: u32,
    /// Bucketed amount.
    pub amount_tier: AmountTier,
}

fn default_jurisdictions() -> u32 {
    1
}

impl ComplianceRequest {
    /// A clean request at the given tier: clear sanctions, low risk,
    /// standard verification, no flags, one jurisdiction.
    pub fn nominal(amount_tier: AmountTier) -> Self {
        Self {
            sanctions: SanctionsStatus::Clear,
            risk_profile: RiskProfile::Low,
            verification: VerificationLevel::Standard,
            compliance_flags: Vec::new(),
            jurisdiction_count: default_jurisdictions(),
            amount_tier,
        }
    }

    /// Flag codes must be short snake_case identifiers so free text (and
    /// with it PII) cannot ride along.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.compliance_flags.len() > MAX_FLAGS {
            return Err(ValidationError::InvalidField {
                field: "compliance_flags",
                reason: format!("at most {MAX_FLAGS} flags allowed"),
            });
        }
        for flag in &self.compliance_flags {
            let well_formed = !flag.is_empty()
                && flag.len() <= MAX_FLAG_LEN
                && flag
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
            if !well_formed {
                return Err(ValidationError::InvalidField {
                    field: "compliance_flags",
                    reason: format!("\"{flag}\" is not a snake_case flag code"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Business impact
// ---------------------------------------------------------------------------

/// How much damage a wrong decision would do; scales the review SLA.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessImpact {
    /// Low impact.
    Low,
    /// Medium impact.
    #[default]
    Medium,
    /// High impact.
    High,
    /// Critical impact.
    Critical,
}

impl BusinessImpact {
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

impl std::fmt::Display for BusinessImpact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AdvisoryPayload
// ---------------------------------------------------------------------------

/// Everything the engine needs to advise on one pending action.
///
/// Either advisory input may be absent; the combiner degrades to a
/// conservative review rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryPayload {
    /// Input for the risk scorer.
    #[serde(default)]
    pub risk: Option<RiskInput>,
    /// Input for the compliance engine.
    #[serde(default)]
    pub compliance: Option<ComplianceRequest>,
    /// Business impact of the action.
    #[serde(default)]
    pub business_impact: BusinessImpact,
    /// Explicit high-value indicator from the originating system.
    #[serde(default)]
    pub high_value: bool,
    /// Explicit request for human review.
    #[serde(default)]
    pub manual_review: bool,
    /// Hashed participant identifiers, for the audit bundle.
    #[serde(default)]
    pub participants: Vec<HashedId>,
}

impl AdvisoryPayload {
    /// The amount tier carried by whichever input is present.
    pub fn amount_tier(&self) -> Option<AmountTier> {
        self.risk
            .as_ref()
            .map(|r| r.amount_tier)
            .or_else(|| self.compliance.as_ref().map(|c| c.amount_tier))
    }

    /// Explicit indicator, or a tier at or above [`HIGH_VALUE_TIER`].
    pub fn is_high_value(&self) -> bool {
        self.high_value
            || self
                .amount_tier()
                .is_some_and(|t| t.at_least(HIGH_VALUE_TIER))
    }

    /// Cross-field shape checks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(risk), Some(compliance)) = (&self.risk, &self.compliance) {
            if risk.amount_tier != compliance.amount_tier {
                return Err(ValidationError::InconsistentTier {
                    risk: risk.amount_tier.get(),
                    compliance: compliance.amount_tier.get(),
                });
            }
        }
        if let Some(compliance) = &self.compliance {
            compliance.validate()?;
        }
        if self.participants.len() > MAX_PARTICIPANTS {
            return Err(ValidationError::InvalidField {
                field: "participants",
                reason: format!("at most {MAX_PARTICIPANTS} participants allowed"),
            });
        }
        Ok(())
    }
}
