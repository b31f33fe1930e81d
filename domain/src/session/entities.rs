//! Session domain entities

use crate::tool::entities::ToolCallIntent;
use crate::tool::value_objects::ToolResult;
use serde::{Deserialize, Serialize};

/// One entry of a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Text typed by the user
    User { text: String },
    /// Text produced by the decision engine
    AssistantText { text: String },
    /// A tool call requested by the decision engine
    ToolCall(ToolCallIntent),
    /// The outcome of a tool call, keyed by the intent's call id
    ToolResult(ToolResult),
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Message::AssistantText { text: text.into() }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::User { .. })
    }
}

/// The part of `history` after (and excluding) the most recent user message.
pub fn current_turn(history: &[Message]) -> &[Message] {
    match history.iter().rposition(Message::is_user) {
        Some(idx) => &history[idx + 1..],
        None => history,
    }
}

/// A single conversation (Entity)
///
/// Holds the identity of the conversation and its append-only history.
/// The conversation runner is the only writer; everything else reads
/// through [`history`](Self::history).
#[derive(Debug, Clone)]
pub struct Session {
    user_id: String,
    session_id: String,
    history: Vec<Message>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            history: Vec::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.history.push(Message::user(text));
    }

    pub fn add_assistant_text(&mut self, text: impl Into<String>) {
        self.history.push(Message::assistant(text));
    }

    pub fn add_tool_call(&mut self, intent: ToolCallIntent) {
        self.history.push(Message::ToolCall(intent));
    }

    pub fn add_tool_result(&mut self, result: ToolResult) {
        self.history.push(Message::ToolResult(result));
    }

    /// Messages after (and excluding) the most recent user message.
    pub fn current_turn(&self) -> &[Message] {
        current_turn(&self.history)
    }

    /// Tool-call intents that have no matching tool result yet.
    ///
    /// Empty whenever a turn has completed.
    pub fn pending_tool_calls(&self) -> Vec<&ToolCallIntent> {
        let mut pending: Vec<&ToolCallIntent> = Vec::new();
        for message in &self.history {
            match message {
                Message::ToolCall(intent) => pending.push(intent),
                Message::ToolResult(result) => {
                    if let Some(pos) = pending.iter().position(|i| i.call_id == result.call_id) {
                        pending.remove(pos);
                    }
                }
                _ => {}
            }
        }
        pending
    }
}
