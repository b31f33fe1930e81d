//! JSON-RPC and MCP protocol types for tool-server communication.
//!
//! # Protocol Overview
//!
//! - **Requests**: client → server (`initialize`, `tools/list`, `tools/call`)
//!   and, occasionally, server → client (`ping`)
//! - **Responses**: `result` or `error`, correlated by `id`
//! - **Notifications**: no `id` (`notifications/initialized`, log messages)
//!
//! The same types are used on both sides of the pipe, so they derive both
//! `Serialize` and `Deserialize`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolrelay_domain::ToolDescriptor;

/// MCP protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error codes used by the tool servers.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::from(id),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC notification (a request without `id`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Name and version of an MCP peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

/// `initialize` request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub client_info: Implementation,
}

impl InitializeParams {
    pub fn new(client_name: impl Into<String>, client_version: impl Into<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: Value::Object(Default::default()),
            client_info: Implementation {
                name: client_name.into(),
                version: client_version.into(),
            },
        }
    }
}

/// `initialize` result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub server_info: Implementation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// `tools/list` request parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// `tools/list` result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<McpTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// One tool as advertised by an MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl McpTool {
    pub fn from_descriptor(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: Some(descriptor.description.clone()),
            input_schema: descriptor.input_schema(),
        }
    }

    pub fn into_descriptor(self) -> ToolDescriptor {
        ToolDescriptor::from_input_schema(
            self.name,
            self.description.unwrap_or_default(),
            &self.input_schema,
        )
    }
}

/// `tools/call` request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, Value>,
}

/// One content block of a tool result (`text`, `image`, `resource`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }
}

/// `tools/call` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Successful result carrying `value` both as text and as structured
    /// content. Non-object values are wrapped as `{"result": value}`.
    pub fn success(value: Value) -> Self {
        let text = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let structured = match value {
            Value::Object(map) => Value::Object(map),
            other => serde_json::json!({ "result": other }),
        };
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: Some(structured),
            is_error: false,
        }
    }

    /// Result flagged `isError` with a text explanation.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            structured_content: None,
            is_error: true,
        }
    }

    /// Concatenated text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.is_text())
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Collapse the result into a single JSON value.
    ///
    /// `structuredContent` wins, with a lone `{"result": v}` wrapper unwrapped
    /// to `v`. Otherwise text blocks are concatenated; if any non-text block
    /// is present the blocks are returned as a JSON array instead.
    pub fn into_value(self) -> Value {
        if let Some(structured) = self.structured_content {
            return match structured {
                Value::Object(mut map) if map.len() == 1 && map.contains_key("result") => {
                    map.remove("result").unwrap_or(Value::Null)
                }
                other => other,
            };
        }

        let all_text = self.content.iter().all(ContentBlock::is_text);
        if all_text {
            return Value::String(self.text());
        }

        Value::Array(
            self.content
                .into_iter()
                .map(|block| serde_json::to_value(block).unwrap_or(Value::Null))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serialization() {
        let request = JsonRpcRequest::new(7, "tools/list", None);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/list"})
        );
    }

    #[test]
    fn response_with_error_parses() {
        let response: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn mcp_tool_into_descriptor() {
        let tool: McpTool = serde_json::from_value(json!({
            "name": "add_numbers",
            "description": "Add two numbers.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "a": {"type": "integer", "title": "A"},
                    "b": {"type": "integer", "title": "B"}
                },
                "required": ["a", "b"]
            }
        }))
        .unwrap();

        let descriptor = tool.into_descriptor();
        assert_eq!(descriptor.name, "add_numbers");
        let names: Vec<_> = descriptor.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(descriptor.parameters.iter().all(|p| p.required));
    }

    #[test]
    fn mcp_tool_without_schema() {
        let tool: McpTool = serde_json::from_value(json!({"name": "get_current_time"})).unwrap();
        let descriptor = tool.into_descriptor();
        assert!(descriptor.parameters.is_empty());
        assert_eq!(descriptor.description, "");
    }

    #[test]
    fn structured_result_wrapper_is_unwrapped() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "155"}],
            "structuredContent": {"result": 155},
            "isError": false
        }))
        .unwrap();
        assert_eq!(result.into_value(), json!(155));
    }

    #[test]
    fn structured_object_is_kept() {
        let result = CallToolResult::success(json!({"files": ["a.txt", "b.txt"]}));
        assert_eq!(result.into_value(), json!({"files": ["a.txt", "b.txt"]}));
    }

    #[test]
    fn text_blocks_are_concatenated() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Echo from MCP: "},
                {"type": "text", "text": "155"}
            ]
        }))
        .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.into_value(), json!("Echo from MCP: 155"));
    }

    #[test]
    fn mixed_blocks_are_kept_as_json() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "chart"},
                {"type": "image", "data": "aGk=", "mimeType": "image/png"}
            ]
        }))
        .unwrap();
        let value = result.into_value();
        assert_eq!(value[0], json!({"type": "text", "text": "chart"}));
        assert_eq!(value[1]["mimeType"], "image/png");
    }

    #[test]
    fn success_round_trips_scalar_values() {
        let result = CallToolResult::success(json!("19/10/2026 09:30"));
        assert_eq!(result.text(), "19/10/2026 09:30");
        assert_eq!(result.into_value(), json!("19/10/2026 09:30"));
    }
}
