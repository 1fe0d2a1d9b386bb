//! Error types for examprep-search

use thiserror::Error;

/// Result type alias using SearchError
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors from a single search call. These never reach the tutor as errors;
/// [`crate::SearchProvider::search`] renders them as text.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Network or transport failure
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body was not the expected shape
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

