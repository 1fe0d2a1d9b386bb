//! Transport abstraction between the session and the hosted model

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use examprep_ai::{
    Context, Message, MessageEventStream, Model, Result,
    providers::{LlmProvider, google::GoogleProvider},
};
use regex::Regex;

/// Everything a single model call needs besides the messages
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Model to use
    pub model: Model,
    /// System instruction
    pub system_prompt: Option<String>,
    /// Tools declared to the model (empty in pre-fetch mode)
    pub tools: Vec<examprep_ai::Tool>,
}

/// Transport for model calls
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the full message list and stream back one reply
    async fn run(&self, messages: Vec<Message>, config: &RunConfig) -> Result<MessageEventStream>;
}

/// Direct provider transport: one request per call, no retry
pub struct ProviderTransport {
    provider: Arc<dyn LlmProvider>,
}

impl ProviderTransport {
    /// Wrap any provider
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Transport backed by the Gemini API
    pub fn google(api_key: impl Into<String>) -> Self {
        Self::new(Arc::new(GoogleProvider::new(api_key)))
    }
}

#[async_trait]
impl Transport for ProviderTransport {
    async fn run(&self, messages: Vec<Message>, config: &RunConfig) -> Result<MessageEventStream> {
        let context = Context {
            system_prompt: config.system_prompt.clone(),
            messages,
            tools: config.tools.clone(),
        };
        self.provider.stream(&config.model, &context).await
    }
}

/// Patterns that mark a stringly error as rate limiting / quota exhaustion.
static RATE_LIMIT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b429\b",
        r"(?i)resource.?exhausted",
        r"(?i)rate.?limit",
        r"(?i)too.?many.?requests",
        r"(?i)quota.?(exceeded|exhausted)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Check if an error message indicates rate limiting
pub fn is_rate_limited_message(error: &str) -> bool {
    RATE_LIMIT_PATTERNS.iter().any(|re| re.is_match(error))
}
