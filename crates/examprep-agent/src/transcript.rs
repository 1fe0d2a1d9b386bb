//! Transcript: the ordered record of a tutoring conversation.

use examprep_ai::{Message, Usage};
use serde::Serialize;

/// Ordered, append-only record of prior turns.
///
/// Only the runtime appends (after a successful model reply); callers can read
/// it or [`clear`](Transcript::clear) it, nothing else. It lives in memory for
/// one session and is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
    total_usage: Usage,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Token usage accumulated across all committed replies
    pub fn total_usage(&self) -> Usage {
        self.total_usage
    }

    /// Number of user submissions recorded
    pub fn user_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::User { .. }))
            .count()
    }

    /// Drop every turn and the usage totals
    pub fn clear(&mut self) {
        self.messages.clear();
        self.total_usage = Usage::default();
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn record_usage(&mut self, usage: &Usage) {
        self.total_usage.add(usage);
    }
}
