//! Streaming event types and utilities

use crate::error::{Error, Result};
use crate::types::{Message, StopReason, Usage};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a model reply streams in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Initial message structure
    Start { message: Message },
    /// Text content delta
    TextDelta { delta: String },
    /// Complete tool call (Gemini sends calls whole, never partial)
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// Message completed successfully
    Done {
        message: Message,
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Error occurred; `status` carries the HTTP status when there was one
    Error {
        message: String,
        #[serde(default)]
        status: Option<u16>,
    },
}

/// A stream of message events
pub type MessageEventStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;

/// A finished model reply
#[derive(Debug, Clone)]
pub struct Completion {
    pub message: Message,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

/// Drain a stream until its terminal event.
///
/// An `Error` event becomes a typed [`Error`]; a stream that ends without a
/// `Done` event is an unexpected response.
pub async fn collect(mut stream: MessageEventStream) -> Result<Completion> {
    while let Some(event) = stream.next().await {
        match event {
            MessageEvent::Done {
                message,
                stop_reason,
                usage,
            } => {
                return Ok(Completion {
                    message,
                    stop_reason,
                    usage,
                });
            }
            MessageEvent::Error {
                message,
                status: Some(status),
            } => return Err(Error::from_status(status, message)),
            MessageEvent::Error {
                message,
                status: None,
            } => return Err(Error::Sse(message)),
            _ => {}
        }
    }
    Err(Error::UnexpectedResponse(
        "stream ended without a final message".to_string(),
    ))
}
