//! Hosted model provider implementations

pub mod google;

use crate::{Context, MessageEventStream, Model, Result};
use async_trait::async_trait;

/// Trait for hosted model providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stream a reply for the given context
    async fn stream(&self, model: &Model, context: &Context) -> Result<MessageEventStream>;
}
