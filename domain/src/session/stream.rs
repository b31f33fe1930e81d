//! Streaming types exchanged during a turn.
//!
//! [`Fragment`] is what the decision engine produces, one piece at a time.
//! [`OutputEvent`] is what the conversation runner hands to its caller.

use crate::tool::entities::ToolCallIntent;
use crate::tool::value_objects::{ErrorKind, ToolResult};

/// One piece of a decision-engine response.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// A text chunk.
    Text(String),
    /// One or more tool calls requested together. Intents in the same
    /// fragment may be executed concurrently.
    ToolCalls(Vec<ToolCallIntent>),
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Fragment::Text(text.into())
    }

    pub fn tool_call(intent: ToolCallIntent) -> Self {
        Fragment::ToolCalls(vec![intent])
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Fragment::Text(s) => Some(s),
            Fragment::ToolCalls(_) => None,
        }
    }
}

/// An event emitted by the conversation runner.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    /// A text chunk from the decision engine, forwarded as soon as it arrives.
    Text(String),
    /// A tool call is about to be dispatched.
    ToolInvoked(ToolCallIntent),
    /// A dispatched tool call finished (successfully or not).
    ToolCompleted(ToolResult),
    /// The turn finished normally.
    Completed {
        /// Number of tool-call rounds the turn needed
        rounds: usize,
    },
    /// The turn ended early.
    Error { kind: ErrorKind, message: String },
}

impl OutputEvent {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        OutputEvent::Error {
            kind,
            message: message.into(),
        }
    }

    /// Returns true if this event is the last one of a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OutputEvent::Completed { .. } | OutputEvent::Error { .. })
    }
}
