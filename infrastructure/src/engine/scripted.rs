//! Scripted decision engine
//!
//! Replays a fixed sequence of rounds. Each engine invocation within a turn
//! answers with the next round; the round is chosen from the history alone
//! (the number of tool-result batches recorded since the last user message),
//! so the engine itself is stateless and can serve several sessions.
//!
//! String values may reference earlier results of the same turn:
//! `{{result.add_numbers}}` expands to the latest `add_numbers` result and
//! `{{last_result}}` to the most recent result of any tool.
//!
//! # Example script (TOML)
//!
//! ```toml
//! [[rounds]]
//! text = ["Let me work that out."]
//! calls = [
//!     { tool = "add_numbers", arguments = { a = 100, b = 55 } },
//!     { tool = "get_current_time" },
//! ]
//!
//! [[rounds]]
//! calls = [{ tool = "get_echo", arguments = { text = "{{result.add_numbers}}" } }]
//!
//! [[rounds]]
//! text = ["100 + 55 = {{result.add_numbers}}. {{result.get_echo}}"]
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use toolrelay_application::{DecisionEngine, EngineError, FragmentStream};
use toolrelay_domain::{Fragment, Message, ToolCallIntent, ToolDescriptor, ToolResult, current_turn};
use tracing::debug;

/// A complete script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub rounds: Vec<ScriptRound>,
    /// Keep answering with the final round once the script is exhausted
    pub repeat_last: bool,
}

impl Script {
    /// Built-in script for the time/math demo server: add, read the clock,
    /// echo the sum, then answer.
    pub fn demo() -> Self {
        Self {
            rounds: vec![
                ScriptRound::call(
                    ScriptedCall::new("add_numbers")
                        .with_arg("a", 100)
                        .with_arg("b", 55),
                )
                .with_call(ScriptedCall::new("get_current_time")),
                ScriptRound::call(
                    ScriptedCall::new("get_echo").with_arg("text", "{{result.add_numbers}}"),
                ),
                ScriptRound::text(
                    "100 + 55 = {{result.add_numbers}}. The current time is \
                     {{result.get_current_time}}. {{result.get_echo}}",
                ),
            ],
            repeat_last: false,
        }
    }
}

/// The response to one engine invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptRound {
    /// Text chunks, emitted in order before any tool call
    pub text: Vec<String>,
    /// Tool calls, emitted together as one fragment
    pub calls: Vec<ScriptedCall>,
    /// Fail the invocation after the other fragments
    pub error: Option<String>,
}

impl ScriptRound {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: vec![text.into()],
            ..Default::default()
        }
    }

    pub fn call(call: ScriptedCall) -> Self {
        Self {
            calls: vec![call],
            ..Default::default()
        }
    }

    pub fn with_call(mut self, call: ScriptedCall) -> Self {
        self.calls.push(call);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedCall {
    /// Call id; generated from the round and position when absent
    #[serde(default)]
    pub id: Option<String>,
    pub tool: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ScriptedCall {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            id: None,
            tool: tool.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

/// Decision engine that replays a [`Script`]
pub struct ScriptedEngine {
    script: Script,
}

impl ScriptedEngine {
    pub fn new(script: Script) -> Self {
        Self { script }
    }

    /// Load a script from a `.json` or `.toml` file (TOML when the extension
    /// is anything else).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Configuration(format!("cannot read script {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let script: Script = if is_json {
            serde_json::from_str(&content).map_err(|e| {
                EngineError::Configuration(format!("invalid script {}: {}", path.display(), e))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                EngineError::Configuration(format!("invalid script {}: {}", path.display(), e))
            })?
        };

        debug!(path = %path.display(), rounds = script.rounds.len(), "Loaded engine script");
        Ok(Self::new(script))
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    fn select_round(&self, index: usize) -> Option<&ScriptRound> {
        match self.script.rounds.get(index) {
            Some(round) => Some(round),
            None if self.script.repeat_last => self.script.rounds.last(),
            None => None,
        }
    }
}

/// Number of tool-result batches (runs of consecutive results) in a turn.
fn answered_rounds(turn: &[Message]) -> usize {
    let mut count = 0;
    let mut in_batch = false;
    for message in turn {
        let is_result = matches!(message, Message::ToolResult(_));
        if is_result && !in_batch {
            count += 1;
        }
        in_batch = is_result;
    }
    count
}

fn render_result(result: &ToolResult) -> String {
    match (result.value(), result.error()) {
        (Some(Value::String(s)), _) => s.clone(),
        (Some(value), _) => value.to_string(),
        (None, Some(error)) => error.message.clone(),
        (None, None) => String::new(),
    }
}

fn expand(template: &str, turn: &[Message]) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }

    let results: Vec<&ToolResult> = turn
        .iter()
        .filter_map(|m| match m {
            Message::ToolResult(r) => Some(r),
            _ => None,
        })
        .collect();

    let mut out = template.to_string();
    if let Some(last) = results.last() {
        out = out.replace("{{last_result}}", &render_result(last));
    }
    // Later results overwrite earlier ones for the same tool
    for result in &results {
        let placeholder = format!("{{{{result.{}}}}}", result.tool_name);
        if out.contains(&placeholder) {
            let latest = results
                .iter()
                .rev()
                .find(|r| r.tool_name == result.tool_name)
                .unwrap_or(result);
            out = out.replace(&placeholder, &render_result(latest));
        }
    }
    out
}

#[async_trait]
impl DecisionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "script"
    }

    async fn respond(
        &self,
        history: &[Message],
        _tools: &[ToolDescriptor],
    ) -> Result<FragmentStream, EngineError> {
        let turn = current_turn(history);
        let index = answered_rounds(turn);

        let Some(round) = self.select_round(index) else {
            debug!(round = index + 1, "Script exhausted, ending turn");
            return Ok(FragmentStream::from_fragments(Vec::new()));
        };
        debug!(round = index + 1, calls = round.calls.len(), "Replaying script round");

        let mut fragments: Vec<Fragment> = round
            .text
            .iter()
            .map(|chunk| Fragment::Text(expand(chunk, turn)))
            .collect();

        if !round.calls.is_empty() {
            let intents = round
                .calls
                .iter()
                .enumerate()
                .map(|(i, call)| {
                    let call_id = call
                        .id
                        .clone()
                        .unwrap_or_else(|| format!("script-{}-{}", index + 1, i + 1));
                    let mut intent = ToolCallIntent::new(call_id, call.tool.clone());
                    for (key, value) in &call.arguments {
                        let value = match value {
                            Value::String(s) => Value::String(expand(s, turn)),
                            other => other.clone(),
                        };
                        intent.arguments.insert(key.clone(), value);
                    }
                    intent
                })
                .collect();
            fragments.push(Fragment::ToolCalls(intents));
        }

        let (tx, stream) = FragmentStream::channel(fragments.len() + 1);
        for fragment in fragments {
            let _ = tx.try_send(Ok(fragment));
        }
        if let Some(message) = &round.error {
            let _ = tx.try_send(Err(EngineError::RequestFailed(expand(message, turn))));
        }
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn demo_script() -> Script {
        Script {
            rounds: vec![
                ScriptRound::text("Working on it.")
                    .with_call(ScriptedCall::new("add_numbers").with_arg("a", 100).with_arg("b", 55)),
                ScriptRound::call(
                    ScriptedCall::new("get_echo").with_arg("text", "{{result.add_numbers}}"),
                ),
                ScriptRound::text("Done: {{last_result}}"),
            ],
            repeat_last: false,
        }
    }

    async fn drain(stream: FragmentStream) -> Vec<Result<Fragment, EngineError>> {
        let mut stream = stream;
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_first_round_after_user_message() {
        let engine = ScriptedEngine::new(demo_script());
        let history = vec![Message::user("Calculate 100 + 55")];

        let items = drain(engine.respond(&history, &[]).await.unwrap()).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok(Fragment::text("Working on it.")));
        let Ok(Fragment::ToolCalls(calls)) = &items[1] else {
            panic!("expected tool calls, got {:?}", items[1]);
        };
        assert_eq!(calls[0].call_id, "script-1-1");
        assert_eq!(calls[0].tool_name, "add_numbers");
        assert_eq!(calls[0].arguments.get("a"), Some(&json!(100)));
    }

    #[tokio::test]
    async fn test_later_rounds_expand_results() {
        let engine = ScriptedEngine::new(demo_script());
        let mut history = vec![
            Message::user("Calculate 100 + 55"),
            Message::assistant("Working on it."),
            Message::ToolCall(ToolCallIntent::new("script-1-1", "add_numbers")),
            Message::ToolResult(ToolResult::success("script-1-1", "add_numbers", json!(155))),
        ];

        let items = drain(engine.respond(&history, &[]).await.unwrap()).await;
        let Ok(Fragment::ToolCalls(calls)) = &items[0] else {
            panic!("expected tool calls, got {:?}", items[0]);
        };
        assert_eq!(calls[0].call_id, "script-2-1");
        assert_eq!(calls[0].get_string("text"), Some("155"));

        history.push(Message::ToolCall(calls[0].clone()));
        history.push(Message::ToolResult(ToolResult::success(
            "script-2-1",
            "get_echo",
            json!("Echo from MCP: 155"),
        )));

        let items = drain(engine.respond(&history, &[]).await.unwrap()).await;
        assert_eq!(items, vec![Ok(Fragment::text("Done: Echo from MCP: 155"))]);
    }

    #[tokio::test]
    async fn test_new_user_message_restarts_script() {
        let engine = ScriptedEngine::new(demo_script());
        let history = vec![
            Message::user("first"),
            Message::ToolResult(ToolResult::success("x", "add_numbers", json!(1))),
            Message::assistant("Done: 1"),
            Message::user("second"),
        ];

        let items = drain(engine.respond(&history, &[]).await.unwrap()).await;
        assert_eq!(items[0], Ok(Fragment::text("Working on it.")));
    }

    #[tokio::test]
    async fn test_exhausted_script_yields_empty_stream() {
        let engine = ScriptedEngine::new(Script {
            rounds: vec![ScriptRound::call(ScriptedCall::new("get_current_time"))],
            repeat_last: false,
        });
        let history = vec![
            Message::user("time?"),
            Message::ToolResult(ToolResult::success("c", "get_current_time", json!("now"))),
        ];
        assert!(drain(engine.respond(&history, &[]).await.unwrap()).await.is_empty());
    }

    #[tokio::test]
    async fn test_repeat_last_keeps_calling() {
        let engine = ScriptedEngine::new(Script {
            rounds: vec![ScriptRound::call(ScriptedCall::new("get_current_time"))],
            repeat_last: true,
        });
        let history = vec![
            Message::user("time?"),
            Message::ToolResult(ToolResult::success("c1", "get_current_time", json!("now"))),
            Message::ToolCall(ToolCallIntent::new("c2", "get_current_time")),
            Message::ToolResult(ToolResult::success("c2", "get_current_time", json!("now"))),
        ];

        let items = drain(engine.respond(&history, &[]).await.unwrap()).await;
        let Ok(Fragment::ToolCalls(calls)) = &items[0] else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].call_id, "script-3-1");
    }

    #[tokio::test]
    async fn test_error_round_fails_after_text() {
        let engine = ScriptedEngine::new(Script {
            rounds: vec![ScriptRound {
                text: vec!["partial".to_string()],
                calls: Vec::new(),
                error: Some("quota exceeded".to_string()),
            }],
            repeat_last: false,
        });

        let items = drain(engine.respond(&[Message::user("hi")], &[]).await.unwrap()).await;
        assert_eq!(items[0], Ok(Fragment::text("partial")));
        assert_eq!(
            items[1],
            Err(EngineError::RequestFailed("quota exceeded".to_string()))
        );
    }

    #[test]
    fn test_demo_script_shape() {
        let script = Script::demo();
        assert_eq!(script.rounds.len(), 3);
        assert_eq!(script.rounds[0].calls.len(), 2);
        assert_eq!(script.rounds[1].calls[0].tool, "get_echo");
        assert!(script.rounds[2].calls.is_empty());
    }

    #[test]
    fn test_answered_rounds_counts_batches() {
        let batch = |id: &str| Message::ToolResult(ToolResult::success(id, "t", json!(1)));
        let turn = vec![
            Message::ToolCall(ToolCallIntent::new("a", "t")),
            Message::ToolCall(ToolCallIntent::new("b", "t")),
            batch("a"),
            batch("b"),
            Message::assistant("more"),
            Message::ToolCall(ToolCallIntent::new("c", "t")),
            batch("c"),
        ];
        assert_eq!(answered_rounds(&turn), 2);
        assert_eq!(answered_rounds(&[]), 0);
    }

    #[test]
    fn test_from_path_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("demo.toml");
        std::fs::write(
            &toml_path,
            r#"
[[rounds]]
text = ["Let me check."]
calls = [{ tool = "add_numbers", arguments = { a = 100, b = 55 } }]

[[rounds]]
text = ["{{result.add_numbers}}"]
"#,
        )
        .unwrap();
        let engine = ScriptedEngine::from_path(&toml_path).unwrap();
        assert_eq!(engine.script().rounds.len(), 2);
        assert_eq!(engine.script().rounds[0].calls[0].arguments["b"], json!(55));

        let json_path = dir.path().join("demo.json");
        std::fs::write(
            &json_path,
            r#"{"rounds": [{"calls": [{"id": "fixed", "tool": "get_current_time"}]}], "repeat_last": true}"#,
        )
        .unwrap();
        let engine = ScriptedEngine::from_path(&json_path).unwrap();
        assert!(engine.script().repeat_last);
        assert_eq!(engine.script().rounds[0].calls[0].id.as_deref(), Some("fixed"));
    }

    #[test]
    fn test_shipped_scripts_parse() {
        let calculate: Script = toml::from_str(include_str!("../../../demos/calculate.toml")).unwrap();
        assert_eq!(calculate.rounds.len(), 3);
        assert_eq!(calculate.rounds[0].calls[1].tool, "get_current_time");

        let list_files: Script = toml::from_str(include_str!("../../../demos/list_files.toml")).unwrap();
        assert_eq!(list_files.rounds[0].calls[0].arguments["directory"], json!("."));
    }

    #[test]
    fn test_from_path_errors_are_configuration_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ScriptedEngine::from_path(dir.path().join("missing.toml")),
            Err(EngineError::Configuration(_))
        ));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "rounds = 3").unwrap();
        assert!(matches!(
            ScriptedEngine::from_path(&bad),
            Err(EngineError::Configuration(_))
        ));
    }
}
