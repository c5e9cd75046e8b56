//! Error types for photorank.
//!
//! Guidance and authentication failures are not errors; they travel as
//! [`ReasonCode`](crate::types::ReasonCode)s inside decisions. What lives here
//! is selection failure, integrity failure and process-level plumbing.

use thiserror::Error;

/// Failures surfaced by pair selection and rating commits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    /// Fewer than two eligible photos after self-exclusion
    #[error("insufficient pool size: {eligible} eligible photo(s), need 2")]
    InsufficientPoolSize { eligible: usize },

    #[error("winner and loser are the same photo: {0}")]
    SelfComparison(String),

    #[error("rating event has an empty idempotency key")]
    EmptyIdempotencyKey,

    #[error("unknown photo: {0}")]
    UnknownPhoto(String),

    #[error("photo {0} is not in the comparison pool")]
    NotInPool(String),

    /// Key already committed for a different winner/loser
    #[error("idempotency key {key} already committed for a different outcome")]
    IdempotencyConflict { key: String },

    #[error("photo {0} already registered")]
    DuplicatePhoto(String),
}

impl RatingError {
    /// Integrity failures point at a caller bug rather than a user-recoverable state
    pub fn is_integrity_failure(&self) -> bool {
        !matches!(self, Self::InsufficientPoolSize { .. })
    }
}

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("rating error: {0}")]
    Rating(#[from] RatingError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
