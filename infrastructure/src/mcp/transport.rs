//! Framing and message classification for MCP over stdio.
//!
//! MCP stdio framing is newline-delimited JSON: each message is one line of
//! UTF-8 JSON with no embedded newlines.
//!
//! - [`encode_frame`]: serialize one message as a frame
//! - [`decode_frame`]: parse one received line
//! - [`classify_message`]: pure function the
//!   [`MessageRouter`](super::router::MessageRouter) reader task uses to
//!   dispatch each frame

use super::error::Result;
use serde::Serialize;
use serde_json::Value;

/// Classification of an incoming JSON-RPC message.
#[derive(Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// A response to a request we sent (has numeric `id`, no `method`).
    Response { id: u64 },
    /// A request from the server (has `id` + `method`), e.g. `ping`.
    IncomingRequest,
    /// A notification (has `method`, no `id`), e.g. `notifications/message`.
    Notification,
    /// Anything else: non-numeric response id, neither id nor method.
    Invalid,
}

/// Classify a JSON-RPC message by inspecting `id` and `method` fields.
pub fn classify_message(json: &Value) -> MessageKind {
    let id = json.get("id").filter(|v| !v.is_null());
    let has_method = json.get("method").and_then(|v| v.as_str()).is_some();

    match (id, has_method) {
        (Some(_), true) => MessageKind::IncomingRequest,
        (Some(id), false) => match id.as_u64() {
            Some(id) => MessageKind::Response { id },
            None => MessageKind::Invalid,
        },
        (None, true) => MessageKind::Notification,
        (None, false) => MessageKind::Invalid,
    }
}

/// Serialize a message into one newline-terminated frame.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let mut frame = serde_json::to_vec(message)?;
    frame.push(b'\n');
    Ok(frame)
}

/// Parse one received line. Blank lines yield `None`.
pub fn decode_frame(line: &[u8]) -> Option<std::result::Result<Value, serde_json::Error>> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_slice(trimmed))
}
