//! # Amount Tiers
//!
//! An [`AmountTier`] is the only representation of a monetary amount the
//! engine accepts. The originating domain system buckets exact amounts into
//! tiers 1–5 before anything reaches the engine.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A 1–5 bucket standing in for an exact monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AmountTier(u8);

impl AmountTier {
    /// Lowest tier.
    pub const MIN: Self = Self(1);
    /// Highest tier.
    pub const MAX: Self = Self(5);

    /// Create a tier, rejecting anything outside 1–5.
    pub fn new(tier: u8) -> Result<Self, ValidationError> {
        if (1..=5).contains(&tier) {
            Ok(Self(tier))
        } else {
            Err(ValidationError::InvalidAmountTier(tier))
        }
    }

    /// The tier number.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Whether this tier is at least `tier`.
    pub fn at_least(self, tier: u8) -> bool {
        self.0 >= tier
    }
}

impl TryFrom<u8> for AmountTier {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AmountTier> for u8 {
    fn from(tier: AmountTier) -> Self {
        tier.0
    }
}

impl std::fmt::Display for AmountTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier-{}", self.0)
    }
}
