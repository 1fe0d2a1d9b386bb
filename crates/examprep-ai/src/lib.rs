//! examprep-ai: hosted model boundary
//!
//! Message and transcript value types, the streaming event protocol, and the
//! Google Generative AI (Gemini) provider used by the tutor runtime.

pub mod error;
pub mod models;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use stream::{Completion, MessageEvent, MessageEventStream};
pub use types::*;
