//! # Advisory Requests
//!
//! [`AdvisoryRequest`] is the unit of work flowing through the engine for one
//! action that needs a recommendation. It is only ever handed to the
//! advisory components after [`AdvisoryRequest::validate`] has passed.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{CorrelationId, HashedId, IdempotencyKey};
use crate::payload::AdvisoryPayload;

/// Default upper bound for `timeout_ms`.
pub const DEFAULT_MAX_TIMEOUT_MS: u64 = 30_000;

/// The kind of pending action the recommendation is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Release funds held in escrow.
    EscrowRelease,
    /// Approve a governance proposal.
    ProposalApproval,
    /// Clear an outgoing payment.
    PaymentClearance,
    /// Transfer or mint tokens.
    TokenTransfer,
}

impl RequestType {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EscrowRelease => "escrow_release",
            Self::ProposalApproval => "proposal_approval",
            Self::PaymentClearance => "payment_clearance",
            Self::TokenTransfer => "token_transfer",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submitter-assigned priority of the request.
///
/// The same scale doubles as the urgency of a human-review request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Low.
    Low,
    /// Medium.
    #[default]
    Medium,
    /// High.
    High,
    /// Critical.
    Critical,
}

impl Priority {
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

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One action needing a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    /// Ties this request to its review outcome and audit trail.
    pub correlation_id: CorrelationId,
    /// De-duplicates retried submissions.
    pub idempotency_key: IdempotencyKey,
    /// Hashed identity of the submitting principal.
    pub submitter_id: HashedId,
    /// Kind of action.
    pub request_type: RequestType,
    /// Submitter-assigned priority.
    #[serde(default)]
    pub priority: Priority,
    /// Budget for the scored path before falling back to rules.
    pub timeout_ms: u64,
    /// Categorical action data.
    pub payload: AdvisoryPayload,
}

impl AdvisoryRequest {
    /// Build a request and run the shape checks against
    /// [`DEFAULT_MAX_TIMEOUT_MS`].
    pub fn new(
        correlation_id: CorrelationId,
        idempotency_key: IdempotencyKey,
        submitter_id: HashedId,
        request_type: RequestType,
        priority: Priority,
        timeout_ms: u64,
        payload: AdvisoryPayload,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            correlation_id,
            idempotency_key,
            submitter_id,
            request_type,
            priority,
            timeout_ms,
            payload,
        };
        request.validate(DEFAULT_MAX_TIMEOUT_MS)?;
        Ok(request)
    }

    /// Cross-field shape checks. Field-level checks already ran when the
    /// newtypes were constructed or deserialized.
    pub fn validate(&self, max_timeout_ms: u64) -> Result<(), ValidationError> {
        if self.timeout_ms == 0 || self.timeout_ms > max_timeout_ms {
            return Err(ValidationError::InvalidTimeout {
                timeout_ms: self.timeout_ms,
                max_ms: max_timeout_ms,
            });
        }
        self.payload.validate()
    }
}
