//! Error types for examprep-ai

use thiserror::Error;

/// Result type alias using examprep-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the hosted model
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    /// Rate limit or quota exhausted (HTTP 429)
    #[error("Rate limited (429): {message}")]
    RateLimited { message: String },

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Build an error from an HTTP status and the provider's message.
    ///
    /// 429 always maps to [`Error::RateLimited`]; 401/403 map to
    /// [`Error::InvalidApiKey`] when the provider gives no message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Error::RateLimited { message },
            401 | 403 if message.trim().is_empty() => Error::InvalidApiKey,
            _ => Error::Api { status, message },
        }
    }

    /// Check if this error reports rate limiting / quota exhaustion
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Error::RateLimited { .. } => true,
            Error::Http(e) => e.status().map(|s| s.as_u16()) == Some(429),
            Error::Api { message, .. } => message.contains("RESOURCE_EXHAUSTED"),
            _ => false,
        }
    }
}
