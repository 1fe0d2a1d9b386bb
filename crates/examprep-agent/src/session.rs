//! Conversation session: sends the transcript plus a new prompt to the model.

use std::sync::Arc;

use examprep_ai::{Message, Model, Usage, stream};

use crate::{
    error::{Error, Result},
    tool::ToolRegistry,
    transcript::Transcript,
    transport::{RunConfig, Transport},
};

/// Default cap on model tool-call rounds within one turn
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 8;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Model to use
    pub model: Model,
    /// Optional system instruction
    pub system_prompt: Option<String>,
    /// How many times the model may call tools before it must answer
    pub max_tool_rounds: u32,
}

impl SessionConfig {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            system_prompt: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

/// One model-issued tool call made during a turn
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: serde_json::Value,
    pub is_error: bool,
}

/// A successful exchange: the reply and the transcript that includes it
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Final text reply
    pub reply: String,
    /// Input transcript plus the prompt, any tool-call records, and the reply
    pub transcript: Transcript,
    /// Tool calls the model made, in order
    pub tool_calls: Vec<ToolCallRecord>,
    /// Usage for this exchange only
    pub usage: Usage,
}

/// The model runtime, optionally given a tool registry.
///
/// With an empty registry every `send` is a single model call. With tools the
/// model may issue tool calls; each runs to completion before the model is
/// called again.
pub struct ConversationSession {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    tools: ToolRegistry,
}

impl ConversationSession {
    /// Create a session without tools
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            tools: ToolRegistry::new(),
        }
    }

    /// Attach a tool registry
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Whether the model can call tools in this session
    pub fn uses_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    /// Names of the tools visible to the model
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    fn run_config(&self) -> RunConfig {
        RunConfig {
            model: self.config.model.clone(),
            system_prompt: self.config.system_prompt.clone(),
            tools: self.tools.api_tools(),
        }
    }

    /// Send `prompt` after the prior `transcript` and return the reply with the
    /// updated transcript.
    ///
    /// `transcript` is never modified. On error nothing is returned to commit,
    /// so the caller's transcript stays authoritative.
    pub async fn send(&self, transcript: &Transcript, prompt: &str) -> Result<Exchange> {
        let run_config = self.run_config();
        let mut working = transcript.clone();
        let mut tool_calls = Vec::new();
        let mut usage = Usage::default();

        working.push(Message::user(prompt));

        let mut round = 0u32;
        loop {
            tracing::debug!(
                round,
                messages = working.len(),
                model = %run_config.model.id,
                "Calling model"
            );

            let event_stream = self
                .transport
                .run(working.messages().to_vec(), &run_config)
                .await?;
            let completion = stream::collect(event_stream).await?;

            usage.add(&completion.usage);
            working.record_usage(&completion.usage);

            let message = completion.message;
            let calls: Vec<(String, String, serde_json::Value)> = message
                .tool_calls()
                .into_iter()
                .map(|(id, name, args)| (id.to_string(), name.to_string(), args.clone()))
                .collect();
            working.push(message.clone());

            if calls.is_empty() {
                let reply = message.text();
                if reply.trim().is_empty() {
                    return Err(Error::EmptyReply);
                }
                return Ok(Exchange {
                    reply,
                    transcript: working,
                    tool_calls,
                    usage,
                });
            }

            round += 1;
            if round > self.config.max_tool_rounds {
                return Err(Error::ToolRoundsExceeded(self.config.max_tool_rounds));
            }

            for (id, name, args) in calls {
                tracing::debug!(tool = %name, "Executing tool call {}", id);
                let result = self.tools.execute(&id, &name, args.clone()).await;
                tool_calls.push(ToolCallRecord {
                    name: name.clone(),
                    arguments: args,
                    is_error: result.is_error,
                });
                working.push(Message::tool_result(id, name, result.content, result.is_error));
            }
        }
    }
}
