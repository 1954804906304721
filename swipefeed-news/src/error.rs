//! Error types for the news module

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while fetching, parsing or classifying feeds
#[derive(Debug, Error)]
pub enum NewsError {
    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within its budget
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Redirect chain longer than the hop limit
    #[error("Too many redirects (limit {limit}) fetching {url}")]
    TooManyRedirects { url: String, limit: usize },

    /// Non-success HTTP status
    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Response body exceeded the byte budget
    #[error("Response body exceeded {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Malformed feed or payload
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A classification rule failed to compile
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
}

impl NewsError {
    /// Failures local to one feed or one image; the pipeline skips them
    pub fn is_transient(&self) -> bool {
        !matches!(self, NewsError::InvalidRule(_))
    }
}
