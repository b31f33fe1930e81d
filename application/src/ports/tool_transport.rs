//! Tool Transport port
//!
//! Defines the interface for talking to a tool process: fetching its catalog
//! and invoking tools. The stdio adapter lives in the infrastructure layer.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use toolrelay_domain::{ErrorKind, ToolDescriptor, ToolError};

/// Errors that can occur during transport operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Failed to spawn tool process: {0}")]
    Spawn(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Transport closed")]
    Closed,

    #[error("Tool execution failed: {message}")]
    ToolExecution {
        message: String,
        details: Option<String>,
    },

    #[error("Request cancelled")]
    Cancelled,
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Spawn(_) => ErrorKind::SpawnError,
            TransportError::Protocol(_) => ErrorKind::ProtocolError,
            TransportError::Timeout(_) => ErrorKind::TimeoutError,
            TransportError::Closed => ErrorKind::ClosedError,
            TransportError::ToolExecution { .. } => ErrorKind::ToolExecutionError,
            TransportError::Cancelled => ErrorKind::CancelledError,
        }
    }

    /// Convert into the error detail of a failed tool result.
    pub fn into_tool_error(self) -> ToolError {
        let kind = self.kind();
        match self {
            TransportError::ToolExecution { message, details } => {
                let error = ToolError::new(kind, message);
                match details {
                    Some(details) => error.with_details(details),
                    None => error,
                }
            }
            other => ToolError::new(kind, other.to_string()),
        }
    }
}

/// Port for the connection to one tool process
///
/// Implementations must allow several `call_tool` invocations to be in flight
/// at once and deliver each response to the caller that issued the request.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Fetch the tool catalog advertised by the tool process.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError>;

    /// Invoke a tool and wait for its value.
    ///
    /// Resolves to [`TransportError::Cancelled`] promptly once `cancel` fires.
    async fn call_tool(
        &self,
        name: &str,
        arguments: &serde_json::Map<String, serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, TransportError>;

    /// Shut the connection down. Idempotent and infallible: problems are
    /// logged, never returned. Pending calls fail with [`TransportError::Closed`].
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(TransportError::Closed.kind(), ErrorKind::ClosedError);
        assert_eq!(
            TransportError::Timeout(Duration::from_millis(10)).kind(),
            ErrorKind::TimeoutError
        );
        assert_eq!(TransportError::Cancelled.kind(), ErrorKind::CancelledError);
    }

    #[test]
    fn test_into_tool_error_keeps_remote_details() {
        let err = TransportError::ToolExecution {
            message: "Directory not found: /nope".into(),
            details: Some("isError".into()),
        }
        .into_tool_error();

        assert_eq!(err.kind, ErrorKind::ToolExecutionError);
        assert_eq!(err.message, "Directory not found: /nope");
        assert_eq!(err.details.as_deref(), Some("isError"));
    }

    #[test]
    fn test_into_tool_error_uses_display() {
        let err = TransportError::Protocol("unexpected frame".into()).into_tool_error();
        assert_eq!(err.kind, ErrorKind::ProtocolError);
        assert_eq!(err.message, "Protocol error: unexpected frame");
    }
}
