//! # Identifier Newtypes
//!
//! Every identifier is a distinct type. You cannot pass a [`HashedId`] where
//! a [`CorrelationId`] is expected.
//!
//! - [`HashedId`]: a participant or submitter identifier, pre-hashed by the
//!   originating system (SHA-256, lowercase hex). Raw identifiers are
//!   rejected at construction.
//! - [`CorrelationId`]: ties a request to its human-review outcome and
//!   audit trail.
//! - [`IdempotencyKey`]: de-duplicates retried submissions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

const MAX_KEY_LEN: usize = 128;

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-')
}

fn validate_key(kind: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.len() > MAX_KEY_LEN || !value.chars().all(is_key_char) {
        return Err(ValidationError::InvalidKey {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// HashedId
// ---------------------------------------------------------------------------

/// A SHA-256 digest (64 lowercase hex characters) standing in for a raw
/// participant identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HashedId(String);

impl HashedId {
    /// Accept a pre-hashed identifier.
    pub fn new(hex: impl Into<String>) -> Result<Self, ValidationError> {
        let hex = hex.into();
        let well_formed = hex.len() == 64
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(ValidationError::InvalidHashedId(hex));
        }
        Ok(Self(hex))
    }

    /// Hash a raw identifier. For collaborators that have not pre-hashed;
    /// the raw value never leaves this function.
    pub fn from_raw(raw: &str) -> Self {
        let digest = Sha256::digest(raw.as_bytes());
        let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
        Self(hex)
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl TryFrom<String> for HashedId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HashedId> for String {
    fn from(id: HashedId) -> Self {
        id.0
    }
}

impl std::fmt::Display for HashedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// CorrelationId
// ---------------------------------------------------------------------------

/// Stable identifier tying a request to its eventual human-review outcome
/// and audit trail.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Validate and wrap a correlation id.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_key("correlation id", &value)?;
        Ok(Self(value))
    }

    /// Generate a fresh random correlation id.
    pub fn generate() -> Self {
        Self(format!("corr-{}", uuid::Uuid::new_v4()))
    }

    /// The id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// IdempotencyKey
// ---------------------------------------------------------------------------

/// Client-chosen key de-duplicating retried submissions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validate and wrap an idempotency key.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_key("idempotency key", &value)?;
        Ok(Self(value))
    }

    /// The key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[test]
    fn hashed_id_accepts_sha256_hex() {
        let id = HashedId::new(HEX).unwrap();
        assert_eq!(id.as_str(), HEX);
        assert_eq!(id.short(), "9f86d081884c");
    }

    #[test]
    fn hashed_id_rejects_raw_identifiers() {
        assert!(HashedId::new("alice@example.com").is_err());
        assert!(HashedId::new(HEX.to_uppercase()).is_err());
        assert!(HashedId::new(&HEX[..63]).is_err());
    }

    #[test]
    fn hashed_id_from_raw_matches_sha256() {
        // SHA-256("test")
        assert_eq!(HashedId::from_raw("test").as_str(), HEX);
    }

    #[test]
    fn hashed_id_deserialize_validates() {
        let json = format!("\"{HEX}\"");
        assert!(serde_json::from_str::<HashedId>(&json).is_ok());
        assert!(serde_json::from_str::<HashedId>("\"bob\"").is_err());
    }

    #[test]
    fn correlation_id_shape() {
        assert!(CorrelationId::new("escrow:release-42").is_ok());
        assert!(CorrelationId::new("").is_err());
        assert!(CorrelationId::new("has space").is_err());
        assert!(CorrelationId::new("x".repeat(129)).is_err());
        assert!(CorrelationId::new("x".repeat(128)).is_ok());
    }

    #[test]
    fn generated_correlation_ids_are_valid_and_unique() {
        let a = CorrelationId::generate();
        let b = CorrelationId::generate();
        assert_ne!(a, b);
        assert!(CorrelationId::new(a.as_str()).is_ok());
    }

    #[test]
    fn idempotency_key_rejects_slash() {
        assert!(IdempotencyKey::new("retry/1").is_err());
        assert_eq!(IdempotencyKey::new("retry-1").unwrap().as_str(), "retry-1");
    }
}
