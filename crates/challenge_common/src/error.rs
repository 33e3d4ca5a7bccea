//! Error types for the challenge core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChallengeError {
    #[error("Catalog is empty")]
    EmptyCatalog,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Persistence unavailable: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returned when an instance has already been completed.
///
/// This is a tagged no-op, not a failure: nothing was mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Challenge already completed: {key}")]
pub struct AlreadyCompleted {
    pub key: String,
}
