//! # Request Extraction
//!
//! Maps JSON rejections to [`AppError::BadRequest`] and runs the
//! [`Validate`] business checks that serde cannot express.

use arbiter_core::CorrelationId;
use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Request DTOs with checks beyond deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// Newtype shape checks (tiers, hashed ids, keys) run during deserialization,
/// so a payload that fails them is a 400 here.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse a correlation id from a path segment.
pub fn correlation_id(raw: &str) -> Result<CorrelationId, AppError> {
    CorrelationId::new(raw).map_err(AppError::from)
}
