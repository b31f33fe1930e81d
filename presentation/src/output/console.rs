//! Console transcript formatter

use crate::output::formatter::EventFormatter;
use colored::Colorize;
use toolrelay_domain::{OutputEvent, ToolDescriptor, ToolResult};

/// Formats a turn as a readable transcript
///
/// ```text
/// USER: Calculate 100 + 55
/// AGENT:
/// [SYSTEM: Calling MCP Tool 'add_numbers']
/// 100 + 55 = 155.
///
/// [SYSTEM: Closing MCP connection...]
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConsoleFormatter {
    show_results: bool,
}

impl ConsoleFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also print successful tool results (failures are always shown).
    pub fn with_results(mut self, show: bool) -> Self {
        self.show_results = show;
        self
    }

    fn system(text: &str) -> String {
        format!("\n{}\n", format!("[SYSTEM: {}]", text).dimmed())
    }

    fn format_result(&self, result: &ToolResult) -> Option<String> {
        match (result.value(), result.error()) {
            (Some(value), _) if self.show_results => {
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some(Self::system(&format!(
                    "Tool '{}' returned {}",
                    result.tool_name, rendered
                )))
            }
            (_, Some(error)) => Some(
                format!(
                    "\n{}\n",
                    format!(
                        "[SYSTEM: Tool '{}' failed ({}): {}]",
                        result.tool_name, error.kind, error.message
                    )
                    .yellow()
                ),
            ),
            _ => None,
        }
    }
}

impl EventFormatter for ConsoleFormatter {
    fn format_user(&self, query: &str) -> Option<String> {
        Some(format!("{} {}\n", "USER:".cyan().bold(), query))
    }

    fn format_turn_start(&self) -> Option<String> {
        Some(format!("{} ", "AGENT:".green().bold()))
    }

    fn format_event(&self, event: &OutputEvent) -> Option<String> {
        match event {
            OutputEvent::Text(chunk) => Some(chunk.clone()),
            OutputEvent::ToolInvoked(intent) => Some(Self::system(&format!(
                "Calling MCP Tool '{}'",
                intent.tool_name
            ))),
            OutputEvent::ToolCompleted(result) => self.format_result(result),
            OutputEvent::Completed { .. } => Some("\n".to_string()),
            OutputEvent::Error { kind, message } => Some(format!(
                "\n{}\n",
                format!("[SYSTEM: Turn ended with {}: {}]", kind, message)
                    .red()
                    .bold()
            )),
        }
    }

    fn format_catalog(&self, tools: &[ToolDescriptor]) -> String {
        if tools.is_empty() {
            return format!("{}\n", "No tools advertised.".yellow());
        }

        let mut output = format!("{} ({})\n", "Tools:".cyan().bold(), tools.len());
        for tool in tools {
            output.push_str(&format!("\n  {}\n", tool.name.bold()));
            if !tool.description.is_empty() {
                output.push_str(&indent(tool.description.trim(), "    "));
                output.push('\n');
            }
            for param in &tool.parameters {
                let required = if param.required { "" } else { ", optional" };
                output.push_str(&format!(
                    "    - {} ({}{})",
                    param.name, param.param_type.as_str(), required
                ));
                if !param.description.is_empty() {
                    output.push_str(&format!(": {}", param.description));
                }
                output.push('\n');
            }
        }
        output
    }

    fn format_closing(&self) -> Option<String> {
        Some(Self::system("Closing MCP connection..."))
    }
}

/// Indent a multi-line string
pub fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolrelay_domain::{ErrorKind, ParamType, ToolCallIntent, ToolError, ToolParameter};

    fn plain() -> ConsoleFormatter {
        colored::control::set_override(false);
        ConsoleFormatter::new()
    }

    #[test]
    fn test_transcript_lines() {
        let f = plain();
        assert_eq!(f.format_user("Calculate 100 + 55").unwrap(), "USER: Calculate 100 + 55\n");
        assert_eq!(f.format_turn_start().unwrap(), "AGENT: ");
        assert_eq!(
            f.format_event(&OutputEvent::ToolInvoked(ToolCallIntent::new("c1", "add_numbers")))
                .unwrap(),
            "\n[SYSTEM: Calling MCP Tool 'add_numbers']\n"
        );
        assert_eq!(
            f.format_event(&OutputEvent::Text("155".into())).unwrap(),
            "155"
        );
        assert_eq!(
            f.format_closing().unwrap(),
            "\n[SYSTEM: Closing MCP connection...]\n"
        );
    }

    #[test]
    fn test_results_hidden_unless_requested() {
        let f = plain();
        let ok = OutputEvent::ToolCompleted(ToolResult::success("c1", "get_echo", json!("Echo from MCP: 155")));
        assert!(f.format_event(&ok).is_none());

        let f = f.with_results(true);
        assert_eq!(
            f.format_event(&ok).unwrap(),
            "\n[SYSTEM: Tool 'get_echo' returned Echo from MCP: 155]\n"
        );
    }

    #[test]
    fn test_failures_always_shown() {
        let f = plain();
        let failed = OutputEvent::ToolCompleted(ToolResult::failure(
            "c1",
            "delete_all",
            ToolError::validation("unknown tool 'delete_all'"),
        ));
        let text = f.format_event(&failed).unwrap();
        assert!(text.contains("Tool 'delete_all' failed (ValidationError)"));

        let runaway = OutputEvent::error(ErrorKind::RunawayToolLoopError, "too many rounds");
        assert_eq!(
            f.format_event(&runaway).unwrap(),
            "\n[SYSTEM: Turn ended with RunawayToolLoopError: too many rounds]\n"
        );
    }

    #[test]
    fn test_catalog() {
        let f = plain();
        let tools = vec![
            ToolDescriptor::new("add_numbers", "Add two numbers.")
                .with_parameter(ToolParameter::new("a", "First integer.", true).with_type(ParamType::Integer)),
            ToolDescriptor::new("get_current_time", ""),
        ];
        let text = f.format_catalog(&tools);
        assert!(text.starts_with("Tools: (2)\n"));
        assert!(text.contains("    - a (integer): First integer.\n"));
        assert!(text.contains("  get_current_time\n"));
        assert_eq!(f.format_catalog(&[]), "No tools advertised.\n");
    }
}
