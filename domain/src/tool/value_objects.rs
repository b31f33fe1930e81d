//! Tool domain value objects: immutable result and error types
//!
//! Every dispatched [`ToolCallIntent`](super::entities::ToolCallIntent)
//! produces exactly one [`ToolResult`]. Failures are ordinary values here:
//! the [`ErrorKind`] tells the decision engine (and the logs) what went
//! wrong without unwinding the conversation loop.

use serde::{Deserialize, Serialize};

/// Classification of every failure the tool subsystem can report.
///
/// | Kind | Scope | Reaches the child process? |
/// |------|-------|----------------------------|
/// | `SpawnError` | session setup | no |
/// | `ProtocolError` | request | yes |
/// | `TimeoutError` | request | yes |
/// | `ClosedError` | request | no |
/// | `ValidationError` | request | no |
/// | `ToolExecutionError` | request | yes |
/// | `CancelledError` | request / turn | maybe |
/// | `RunawayToolLoopError` | turn | no |
/// | `EngineError` | turn | no |
/// | `EmptyCatalogError` | session setup (soft) | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    SpawnError,
    ProtocolError,
    TimeoutError,
    ClosedError,
    ValidationError,
    ToolExecutionError,
    CancelledError,
    RunawayToolLoopError,
    EngineError,
    EmptyCatalogError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SpawnError => "SpawnError",
            ErrorKind::ProtocolError => "ProtocolError",
            ErrorKind::TimeoutError => "TimeoutError",
            ErrorKind::ClosedError => "ClosedError",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::ToolExecutionError => "ToolExecutionError",
            ErrorKind::CancelledError => "CancelledError",
            ErrorKind::RunawayToolLoopError => "RunawayToolLoopError",
            ErrorKind::EngineError => "EngineError",
            ErrorKind::EmptyCatalogError => "EmptyCatalogError",
        }
    }

    /// Whether a failure of this kind ends the whole turn rather than a
    /// single call.
    pub fn is_turn_fatal(&self) -> bool {
        matches!(
            self,
            ErrorKind::SpawnError
                | ErrorKind::RunawayToolLoopError
                | ErrorKind::EngineError
                | ErrorKind::CancelledError
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error detail carried by a failed [`ToolResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Failure classification
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Additional details (remote error code, raw payload, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ToolExecutionError, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::TimeoutError,
            format!("Operation timed out: {}", operation.into()),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::CancelledError, "Tool call cancelled")
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Normalized outcome of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Correlation id of the originating intent
    pub call_id: String,
    /// Name of the tool that was called
    pub tool_name: String,
    /// Whether the call succeeded
    pub success: bool,
    /// Value returned by the tool (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Error information (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    /// Wall-clock duration of the call in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            success: true,
            value: Some(value),
            error: None,
            duration_ms: None,
        }
    }

    /// Create a failed result
    pub fn failure(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: ToolError,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            success: false,
            value: None,
            error: Some(error),
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn value(&self) -> Option<&serde_json::Value> {
        self.value.as_ref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Render the outcome as the JSON object handed back to the decision
    /// engine: `{"result": value}` or `{"error": {"kind", "message"}}`.
    pub fn to_engine_payload(&self) -> serde_json::Value {
        match (&self.value, &self.error) {
            (Some(value), _) if self.success => serde_json::json!({ "result": value }),
            (_, Some(error)) => serde_json::json!({
                "error": { "kind": error.kind.as_str(), "message": error.message }
            }),
            _ => serde_json::json!({ "result": null }),
        }
    }
}
