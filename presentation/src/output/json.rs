//! JSON Lines formatter (one object per event, for scripting)

use crate::output::formatter::EventFormatter;
use serde_json::{Value, json};
use toolrelay_domain::{OutputEvent, ToolDescriptor};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    fn line(value: Value) -> String {
        format!("{}\n", value)
    }

    pub fn event_to_json(event: &OutputEvent) -> Value {
        match event {
            OutputEvent::Text(chunk) => json!({ "event": "text", "text": chunk }),
            OutputEvent::ToolInvoked(intent) => json!({
                "event": "tool_invoked",
                "call_id": intent.call_id,
                "tool": intent.tool_name,
                "arguments": intent.arguments,
            }),
            OutputEvent::ToolCompleted(result) => json!({
                "event": "tool_completed",
                "result": result,
            }),
            OutputEvent::Completed { rounds } => json!({ "event": "completed", "rounds": rounds }),
            OutputEvent::Error { kind, message } => json!({
                "event": "error",
                "kind": kind.as_str(),
                "message": message,
            }),
        }
    }
}

impl EventFormatter for JsonFormatter {
    fn format_user(&self, query: &str) -> Option<String> {
        Some(Self::line(json!({ "event": "user", "text": query })))
    }

    fn format_turn_start(&self) -> Option<String> {
        None
    }

    fn format_event(&self, event: &OutputEvent) -> Option<String> {
        Some(Self::line(Self::event_to_json(event)))
    }

    fn format_catalog(&self, tools: &[ToolDescriptor]) -> String {
        let tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema(),
                })
            })
            .collect();
        Self::line(json!({ "tools": tools }))
    }

    fn format_closing(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolrelay_domain::{ErrorKind, ToolCallIntent, ToolResult};

    fn parse(line: Option<String>) -> Value {
        serde_json::from_str(line.unwrap().trim_end()).unwrap()
    }

    #[test]
    fn test_events_are_single_lines() {
        let f = JsonFormatter;
        let invoked = parse(f.format_event(&OutputEvent::ToolInvoked(
            ToolCallIntent::new("c1", "add_numbers").with_arg("a", 100),
        )));
        assert_eq!(invoked["event"], "tool_invoked");
        assert_eq!(invoked["arguments"]["a"], 100);

        let completed = parse(f.format_event(&OutputEvent::ToolCompleted(ToolResult::success(
            "c1",
            "add_numbers",
            json!(155),
        ))));
        assert_eq!(completed["result"]["value"], 155);
        assert_eq!(completed["result"]["success"], true);

        let error = parse(f.format_event(&OutputEvent::error(
            ErrorKind::CancelledError,
            "interrupted",
        )));
        assert_eq!(error, json!({"event": "error", "kind": "CancelledError", "message": "interrupted"}));
    }

    #[test]
    fn test_no_decorations() {
        assert!(JsonFormatter.format_turn_start().is_none());
        assert!(JsonFormatter.format_closing().is_none());
        assert_eq!(
            parse(JsonFormatter.format_user("hi")),
            json!({"event": "user", "text": "hi"})
        );
    }
}
