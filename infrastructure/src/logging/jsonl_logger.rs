//! JSONL transcript writer for conversation events.
//!
//! Each [`ConversationEvent`] becomes one JSON line carrying `type`,
//! `timestamp` and a per-file `seq` number next to the event payload. Files
//! are opened in append mode so several runs can share one transcript.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use toolrelay_application::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use tracing::warn;

struct Inner {
    writer: BufWriter<File>,
    seq: u64,
}

/// Conversation logger that appends one JSON object per line.
pub struct JsonlConversationLogger {
    inner: Mutex<Inner>,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Open (or create) the transcript at `path`.
    ///
    /// Creates parent directories as needed. Returns `None` and logs a
    /// warning if the file cannot be opened; transcripts are optional.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create conversation log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open conversation log {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            inner: Mutex::new(Inner {
                writer: BufWriter::new(file),
                seq: 0,
            }),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: ConversationEvent, seq: u64) -> serde_json::Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let mut record = serde_json::Map::new();
        record.insert("type".into(), event.event_type.into());
        record.insert("timestamp".into(), timestamp.into());
        record.insert("seq".into(), seq.into());

        match event.payload {
            serde_json::Value::Object(payload) => {
                for (key, value) in payload {
                    // Envelope fields win over payload fields of the same name
                    record.entry(key).or_insert(value);
                }
            }
            serde_json::Value::Null => {}
            other => {
                record.insert("data".into(), other);
            }
        }
        serde_json::Value::Object(record)
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.seq += 1;
        let record = Self::record(event, inner.seq);

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        if let Err(e) = writeln!(inner.writer, "{}", line).and_then(|_| inner.writer.flush()) {
            warn!("Failed to write conversation log {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for JsonlConversationLogger {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            let _ = inner.writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_turn_events_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("session_01.jsonl");
        let logger = JsonlConversationLogger::open(&path).unwrap();

        logger.log(ConversationEvent::new(
            "user_message",
            json!({"session_id": "session_01", "text": "Calculate 100 + 55"}),
        ));
        logger.log(ConversationEvent::new(
            "tool_call",
            json!({"call_id": "c1", "tool": "add_numbers", "arguments": {"a": 100, "b": 55}}),
        ));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "user_message");
        assert_eq!(lines[0]["seq"], 1);
        assert_eq!(lines[0]["text"], "Calculate 100 + 55");
        assert!(lines[0]["timestamp"].is_string());
        assert_eq!(lines[1]["type"], "tool_call");
        assert_eq!(lines[1]["seq"], 2);
        assert_eq!(lines[1]["arguments"]["b"], 55);
    }

    #[test]
    fn test_appends_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");

        let first = JsonlConversationLogger::open(&path).unwrap();
        first.log(ConversationEvent::new("turn_end", json!({"rounds": 2})));
        drop(first);

        let second = JsonlConversationLogger::open(&path).unwrap();
        second.log(ConversationEvent::new("turn_end", json!({"rounds": 0})));
        drop(second);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["rounds"], 2);
        assert_eq!(lines[1]["rounds"], 0);
    }

    #[test]
    fn test_non_object_payload_goes_to_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.jsonl");
        let logger = JsonlConversationLogger::open(&path).unwrap();

        logger.log(ConversationEvent::new("assistant_text", json!("Echo from MCP: 155")));
        logger.log(ConversationEvent::new("type", json!({"type": "spoofed"})));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["data"], "Echo from MCP: 155");
        assert_eq!(lines[1]["type"], "type");
    }

    #[test]
    fn test_open_fails_on_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonlConversationLogger::open(dir.path()).is_none());
    }
}
