//! # Error Types
//!
//! Shared error types for the primitives in this crate. Higher layers define
//! their own `thiserror` enums (validation, evaluation, lifecycle) and wrap
//! these where a primitive fails to parse.

use thiserror::Error;

/// Error raised while parsing or constructing a core primitive.
#[derive(Error, Debug)]
pub enum RgovError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A timestamp string could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A severity label is not one of CRITICAL/HIGH/MEDIUM/LOW/INFO.
    #[error("unknown severity: {0:?}")]
    UnknownSeverity(String),

    /// An identifier failed validation.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
