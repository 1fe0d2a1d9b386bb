//! examprep-agent: the tutor runtime
//!
//! A [`TurnController`] runs one user submission at a time: optionally search,
//! compose the tutoring prompt, hand it to the [`ConversationSession`] together
//! with the [`Transcript`], and commit the transcript only when the model
//! replies successfully.

pub mod controller;
pub mod error;
pub mod prompt;
pub mod search_tool;
pub mod session;
pub mod tool;
pub mod transcript;
pub mod transport;

pub use controller::{
    ResearchMode, TurnController, TurnFailure, TurnObserver, TurnOutcome, TurnReply, TurnState,
};
pub use error::{Error, Result};
pub use search_tool::SearchTool;
pub use session::{ConversationSession, Exchange, SessionConfig, ToolCallRecord};
pub use tool::{BoxedTool, Tool, ToolRegistry, ToolResult};
pub use transcript::Transcript;
pub use transport::{ProviderTransport, RunConfig, Transport};
