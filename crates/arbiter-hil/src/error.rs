//! # Approval Queue Errors

use thiserror::Error;

/// Errors from [`ApprovalQueue`](crate::ApprovalQueue) operations.
///
/// Each variant names the correlation id so operators can find the request
/// and its audit trail directly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// A request with this correlation id is already queued.
    #[error("approval request {correlation_id} already submitted")]
    DuplicateSubmission {
        /// The correlation id.
        correlation_id: String,
    },

    /// No request with this correlation id.
    #[error("approval request {correlation_id} not found")]
    NotFound {
        /// The correlation id.
        correlation_id: String,
    },

    /// The request already received a human response.
    #[error("approval request {correlation_id} already resolved at {resolved_at}")]
    AlreadyResolved {
        /// The correlation id.
        correlation_id: String,
        /// When it was resolved (RFC 3339).
        resolved_at: String,
    },

    /// The SLA window would not end after submission.
    #[error("approval request {correlation_id} has a non-positive SLA of {sla_seconds}s")]
    InconsistentDeadline {
        /// The correlation id.
        correlation_id: String,
        /// The rejected SLA window.
        sla_seconds: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_correlation_id() {
        let err = QueueError::DuplicateSubmission {
            correlation_id: "corr-1".into(),
        };
        assert_eq!(err.to_string(), "approval request corr-1 already submitted");

        let err = QueueError::AlreadyResolved {
            correlation_id: "corr-2".into(),
            resolved_at: "2026-01-15T12:00:00+00:00".into(),
        };
        assert!(err.to_string().contains("corr-2"));
        assert!(err.to_string().contains("2026-01-15"));
    }

    #[test]
    fn inconsistent_deadline_display() {
        let err = QueueError::InconsistentDeadline {
            correlation_id: "corr-3".into(),
            sla_seconds: 0,
        };
        assert_eq!(
            err.to_string(),
            "approval request corr-3 has a non-positive SLA of 0s"
        );
    }
}
