//! Error types for Carelog
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Carelog operations
///
/// This enum encompasses all possible errors that can occur during
/// conversation persistence, configuration loading, snapshot
/// import/export, and storage quota enforcement.
#[derive(Error, Debug)]
pub enum CarelogError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Conversation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// The persistence layer refused a write because the byte quota was reached
    #[error("Storage quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded {
        /// Bytes the rejected write would have occupied
        needed: u64,
        /// Bytes still available under the capacity
        available: u64,
    },

    /// An operation referenced a conversation id that does not exist
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// Import input is not a recognizable snapshot document
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// A single record inside an otherwise valid snapshot failed validation
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for Carelog operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Returns true if the error chain bottoms out in a quota rejection.
///
/// Write paths use this to decide whether freeing space and retrying
/// is worthwhile.
pub fn is_quota_exceeded(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<CarelogError>(),
        Some(CarelogError::QuotaExceeded { .. })
    )
}

/// Returns true if the error chain bottoms out in a missing conversation.
///
/// Callers of `update` use this to fall back to `create`.
pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<CarelogError>(),
        Some(CarelogError::NotFound(_))
    )
}
