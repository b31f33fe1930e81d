//! Error types for the MCP stdio adapter

use std::time::Duration;
use thiserror::Error;
use toolrelay_application::TransportError;

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur when communicating with an MCP tool server
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Failed to spawn tool server '{command}': {source}")]
    SpawnError {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("JSON-RPC error (code {code}): {message}")]
    RpcError {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Tool reported an error: {0}")]
    ToolFailed(String),

    #[error("Transport closed")]
    TransportClosed,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,
}

impl From<McpError> for TransportError {
    fn from(error: McpError) -> Self {
        match error {
            McpError::SpawnError { .. } => TransportError::Spawn(error.to_string()),
            McpError::Io(_) | McpError::TransportClosed => TransportError::Closed,
            McpError::SerializationError(e) => TransportError::Protocol(e.to_string()),
            McpError::UnexpectedResponse(msg) => TransportError::Protocol(msg),
            McpError::RpcError {
                code,
                message,
                data,
            } => TransportError::ToolExecution {
                message,
                details: Some(match data {
                    Some(data) => format!("code {code}: {data}"),
                    None => format!("code {code}"),
                }),
            },
            McpError::ToolFailed(message) => TransportError::ToolExecution {
                message,
                details: None,
            },
            McpError::Timeout(d) => TransportError::Timeout(d),
            McpError::Cancelled => TransportError::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolrelay_domain::ErrorKind;

    #[test]
    fn rpc_error_maps_to_tool_execution() {
        let err: TransportError = McpError::RpcError {
            code: -32602,
            message: "Unknown tool: nope".into(),
            data: None,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ToolExecutionError);
        assert_eq!(
            err,
            TransportError::ToolExecution {
                message: "Unknown tool: nope".into(),
                details: Some("code -32602".into()),
            }
        );
    }

    #[test]
    fn spawn_error_keeps_command() {
        let err: TransportError = McpError::SpawnError {
            command: "no-such-server".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::SpawnError);
        assert!(err.to_string().contains("no-such-server"));
    }

    #[test]
    fn closed_and_io_map_to_closed() {
        assert_eq!(TransportError::from(McpError::TransportClosed), TransportError::Closed);
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert_eq!(TransportError::from(McpError::Io(io)), TransportError::Closed);
    }
}
