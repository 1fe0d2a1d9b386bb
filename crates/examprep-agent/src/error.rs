//! Error types for examprep-agent

use thiserror::Error;

use crate::transport::is_rate_limited_message;

/// Result type alias using examprep-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a conversation turn
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the hosted model layer
    #[error(transparent)]
    Ai(#[from] examprep_ai::Error),

    /// The model finished without any text for the user
    #[error("The model returned an empty reply")]
    EmptyReply,

    /// The model kept requesting tools past the per-turn limit
    #[error("The model made {0} rounds of tool calls without answering")]
    ToolRoundsExceeded(u32),
}

impl Error {
    /// Check if this error means the model provider is rate limiting us
    pub fn is_rate_limited(&self) -> bool {
        match self {
            // A typed status other than 429 is authoritative; its text may
            // mention 429 for unrelated reasons
            Error::Ai(e @ examprep_ai::Error::Api { .. }) => e.is_rate_limited(),
            Error::Ai(e) => e.is_rate_limited() || is_rate_limited_message(&e.to_string()),
            Error::EmptyReply | Error::ToolRoundsExceeded(_) => false,
        }
    }
}
