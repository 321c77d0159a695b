//! # Error Hierarchy
//!
//! Structured error types for the advisory engine, built with `thiserror`.
//!
//! Only [`ValidationError`] ever reaches a caller as a hard failure. The other
//! [`ArbiterError`] variants describe degraded conditions (missing advisory
//! input, scoring timeout, late human response) that are recorded and then
//! absorbed by a conservative default.

use thiserror::Error;

/// Top-level error type for the advisory engine.
#[derive(Error, Debug)]
pub enum ArbiterError {
    /// Malformed or missing payload. The request is not processed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// One or both advisory inputs were absent for an action.
    #[error("missing advisory data for {correlation_id}: {missing}")]
    MissingAdvisoryData {
        /// The affected correlation id.
        correlation_id: String,
        /// Which component(s) did not run.
        missing: String,
    },

    /// The scored path exceeded the request's `timeout_ms`.
    #[error("scoring for {correlation_id} exceeded {timeout_ms}ms")]
    Timeout {
        /// The affected correlation id.
        correlation_id: String,
        /// The deadline that was exceeded.
        timeout_ms: u64,
    },

    /// A human response arrived after the SLA deadline.
    #[error("SLA violated for {correlation_id}: expired at {expired_at}, resolved at {resolved_at}")]
    SlaViolation {
        /// The affected correlation id.
        correlation_id: String,
        /// The SLA deadline (RFC 3339).
        expired_at: String,
        /// When the response arrived (RFC 3339).
        resolved_at: String,
    },
}

/// Construction-time shape failures for domain primitives and requests.
///
/// Each variant carries the rejected input and the expected shape so that
/// the submitting system can fix the payload without guesswork.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Amount tier outside 1–5.
    #[error("invalid amount tier {0} (expected 1-5)")]
    InvalidAmountTier(u8),

    /// Identifier is not a pre-hashed SHA-256 digest.
    #[error("invalid hashed identifier \"{0}\" (expected 64 lowercase hex characters)")]
    InvalidHashedId(String),

    /// Correlation id or idempotency key is empty, too long, or uses
    /// characters outside `[A-Za-z0-9._:-]`.
    #[error("invalid {kind}: \"{value}\" (expected 1-128 characters of [A-Za-z0-9._:-])")]
    InvalidKey {
        /// Which key failed ("correlation id", "idempotency key").
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Timeout outside the accepted range.
    #[error("invalid timeout {timeout_ms}ms (expected 1-{max_ms}ms)")]
    InvalidTimeout {
        /// The requested timeout.
        timeout_ms: u64,
        /// The configured maximum.
        max_ms: u64,
    },

    /// Risk and compliance inputs disagree about the amount tier.
    #[error("inconsistent amount tiers: risk input has tier {risk}, compliance input has tier {compliance}")]
    InconsistentTier {
        /// Tier carried by the risk input.
        risk: u8,
        /// Tier carried by the compliance input.
        compliance: u8,
    },

    /// A free-text field exceeded its bound or contained a raw value.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_converts_into_arbiter_error() {
        let err: ArbiterError = ValidationError::InvalidAmountTier(9).into();
        let msg = format!("{err}");
        assert!(msg.contains("validation error"));
        assert!(msg.contains("9"));
    }

    #[test]
    fn timeout_display_names_deadline() {
        let err = ArbiterError::Timeout {
            correlation_id: "esc-1".into(),
            timeout_ms: 250,
        };
        assert_eq!(format!("{err}"), "scoring for esc-1 exceeded 250ms");
    }

    #[test]
    fn sla_violation_display() {
        let err = ArbiterError::SlaViolation {
            correlation_id: "esc-2".into(),
            expired_at: "2026-01-15T12:00:00Z".into(),
            resolved_at: "2026-01-15T12:30:00Z".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("esc-2"));
        assert!(msg.contains("12:30:00"));
    }

    #[test]
    fn inconsistent_tier_display() {
        let err = ValidationError::InconsistentTier {
            risk: 2,
            compliance: 4,
        };
        assert!(format!("{err}").contains("tier 2"));
        assert!(format!("{err}").contains("tier 4"));
    }

    #[test]
    fn invalid_key_display() {
        let err = ValidationError::InvalidKey {
            kind: "correlation id",
            value: "".into(),
        };
        assert!(format!("{err}").starts_with("invalid correlation id"));
    }
}
