//! Minimal MCP stdio server
//!
//! Reads newline-delimited JSON-RPC 2.0 from a reader and answers on a
//! writer. Supports `initialize`, `ping`, `tools/list` and `tools/call`;
//! notifications are accepted and ignored.
//!
//! Error mapping:
//! - unknown method → `-32601`
//! - unknown tool or arguments that do not match the schema → `-32602`
//! - a tool's own failure → a normal result with `isError: true`

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use toolrelay_domain::{DefaultToolValidator, ToolDescriptor, ToolValidator};
use toolrelay_infrastructure::mcp::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeResult, JsonRpcResponse,
    ListToolsResult, McpTool, PROTOCOL_VERSION, RpcError, error_codes,
};
use tracing::{debug, info, warn};

/// Why a tool could not produce a value
#[derive(Debug, Error, PartialEq)]
pub enum ToolFailure {
    /// The arguments are unusable; answered with a JSON-RPC error
    #[error("{0}")]
    InvalidParams(String),

    /// The tool ran and failed; answered with an `isError` result
    #[error("{0}")]
    Domain(String),
}

/// One tool served by a [`ToolServer`]
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool. Arguments have already been checked against
    /// [`descriptor`](Self::descriptor).
    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value, ToolFailure>;
}

pub struct ToolServer {
    info: Implementation,
    tools: Vec<(ToolDescriptor, Arc<dyn ToolHandler>)>,
    validator: DefaultToolValidator,
}

impl ToolServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: Implementation {
                name: name.into(),
                version: version.into(),
            },
            tools: Vec::new(),
            validator: DefaultToolValidator,
        }
    }

    pub fn with_tool(mut self, handler: impl ToolHandler + 'static) -> Self {
        let descriptor = handler.descriptor();
        self.tools.push((descriptor, Arc::new(handler)));
        self
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|(d, _)| d.name.as_str())
    }

    /// Serve the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve one connection until the reader reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(server = %self.info.name, "Serving MCP over stdio");
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let reply = match serde_json::from_str::<Value>(line) {
                Ok(message) => self.handle_message(message).await,
                Err(e) => {
                    warn!("Unparseable message: {}", e);
                    Some(JsonRpcResponse::failure(
                        Value::Null,
                        RpcError::new(error_codes::PARSE_ERROR, format!("Parse error: {}", e)),
                    ))
                }
            };

            if let Some(response) = reply {
                let mut frame = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
                frame.push(b'\n');
                writer.write_all(&frame).await?;
                writer.flush().await?;
            }
        }

        info!(server = %self.info.name, "Input closed, shutting down");
        Ok(())
    }

    /// Handle one decoded message. Returns `None` for notifications and
    /// stray responses.
    pub async fn handle_message(&self, message: Value) -> Option<JsonRpcResponse> {
        let id = match message.get("id") {
            None | Some(Value::Null) => {
                debug!(method = ?message.get("method"), "Notification ignored");
                return None;
            }
            Some(id) => id.clone(),
        };

        let Some(method) = message.get("method").and_then(|m| m.as_str()) else {
            if message.get("result").is_some() || message.get("error").is_some() {
                return None;
            }
            return Some(JsonRpcResponse::failure(
                id,
                RpcError::new(error_codes::INVALID_REQUEST, "Missing method"),
            ));
        };
        let params = message.get("params").cloned().unwrap_or(Value::Null);
        debug!(method, "Request");

        let result = match method {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(params).await,
            other => Err(RpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self) -> Value {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: self.info.clone(),
            instructions: None,
        };
        serde_json::to_value(result).unwrap_or_else(|_| json!({}))
    }

    fn list_tools(&self) -> Value {
        let result = ListToolsResult {
            tools: self
                .tools
                .iter()
                .map(|(d, _)| McpTool::from_descriptor(d))
                .collect(),
            next_cursor: None,
        };
        serde_json::to_value(result).unwrap_or_else(|_| json!({ "tools": [] }))
    }

    async fn call_tool(&self, params: Value) -> Result<Value, RpcError> {
        let params: CallToolParams = serde_json::from_value(params).map_err(|e| {
            RpcError::new(error_codes::INVALID_PARAMS, format!("Invalid params: {}", e))
        })?;

        let Some((descriptor, handler)) = self.tools.iter().find(|(d, _)| d.name == params.name)
        else {
            return Err(RpcError::new(
                error_codes::INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            ));
        };

        self.validator
            .validate(descriptor, &params.arguments)
            .map_err(|e| RpcError::new(error_codes::INVALID_PARAMS, e.to_string()))?;

        let result = match handler.call(&params.arguments).await {
            Ok(value) => CallToolResult::success(value),
            Err(ToolFailure::InvalidParams(message)) => {
                return Err(RpcError::new(error_codes::INVALID_PARAMS, message));
            }
            Err(ToolFailure::Domain(message)) => {
                debug!(tool = %params.name, "Tool failed: {}", message);
                CallToolResult::error(message)
            }
        };
        serde_json::to_value(result)
            .map_err(|e| RpcError::new(error_codes::INTERNAL_ERROR, e.to_string()))
    }
}

/// Read an integer argument, accepting integral floats such as `100.0`.
pub fn integer_arg(arguments: &Map<String, Value>, name: &str) -> Result<i64, ToolFailure> {
    let value = arguments
        .get(name)
        .ok_or_else(|| ToolFailure::InvalidParams(format!("missing '{}'", name)))?;
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => Ok(f as i64),
        _ => Err(ToolFailure::InvalidParams(format!(
            "'{}' must be an integer",
            name
        ))),
    }
}

/// Read a string argument.
pub fn string_arg<'a>(arguments: &'a Map<String, Value>, name: &str) -> Result<&'a str, ToolFailure> {
    arguments
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolFailure::InvalidParams(format!("'{}' must be a string", name)))
}
