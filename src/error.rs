//! Error types for botscore

use thiserror::Error;

/// Structural errors that abort scoring of a session.
///
/// Missing or malformed individual events are not errors: the owning
/// extractor degrades its own features instead (see [`crate::features::Extracted`]).
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Failed to parse session: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Timestamp parse error: {0}")]
    TimestampError(String),

    #[error("Invalid scoring rule: {0}")]
    InvalidRule(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No usable features: {0}")]
    NoUsableFeatures(String),

    #[error("Aggregation error: {0}")]
    AggregationError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
