#![deny(missing_docs)]

//! # arbiter-core: Foundational Types for the Advisory Engine
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies: only `serde`, `thiserror`, `uuid`,
//! and `sha2` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Clamped scores.** [`Confidence`] and [`RiskScore`] can only hold values
//!    in `[0, 1]`. Every arithmetic path re-clamps, so no produced structure can
//!    carry an out-of-range value.
//!
//! 2. **PII-safe by construction.** Amounts only exist as an [`AmountTier`]
//!    (1–5) and participant identifiers only as a [`HashedId`] (SHA-256 hex).
//!    Both validate in their constructors *and* in `Deserialize`, so a payload
//!    carrying a raw amount or a raw identifier cannot be represented.
//!
//! 3. **[`ArbiterError`] hierarchy.** Structured errors with `thiserror`: no
//!    `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod payload;
pub mod request;
pub mod score;
pub mod tier;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{ArbiterError, ValidationError};
pub use identity::{CorrelationId, HashedId, IdempotencyKey};
pub use payload::{
    AdvisoryPayload, BusinessImpact, ComplianceRequest, RiskInput, RiskProfile, SanctionsStatus,
    VerificationLevel, HIGH_VALUE_TIER,
};
pub use request::{AdvisoryRequest, Priority, RequestType, DEFAULT_MAX_TIMEOUT_MS};
pub use score::{Confidence, RiskCategory, RiskScore};
pub use tier::AmountTier;
