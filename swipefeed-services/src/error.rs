//! Service-level errors

use thiserror::Error;

/// Preference storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to acquire lock")]
    LockError,
}

/// Errors surfaced to callers of `FeedService`
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Every article source failed and nothing was cached
    #[error("No accessible article source")]
    NoAccessibleSource,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
