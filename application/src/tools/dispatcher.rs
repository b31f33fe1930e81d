//! Dispatcher
//!
//! Turns [`ToolCallIntent`]s into [`ToolResult`]s. Every failure, whether a
//! rejected argument or a dead tool process, comes back as a failed result
//! so the conversation loop never has to unwind.

use super::registry::ToolRegistry;
use crate::ports::tool_transport::{ToolTransport, TransportError};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use toolrelay_domain::{ToolCallIntent, ToolError, ToolResult};
use tracing::{debug, info, warn};

/// Routes validated tool calls to the transport.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    transport: Arc<dyn ToolTransport>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, transport: Arc<dyn ToolTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Validate and execute one call.
    pub async fn dispatch(&self, intent: &ToolCallIntent, cancel: &CancellationToken) -> ToolResult {
        if let Err(e) = self.registry.validate(&intent.tool_name, &intent.arguments) {
            warn!(tool = %intent.tool_name, call_id = %intent.call_id, "Rejected tool call: {}", e);
            return ToolResult::failure(
                &intent.call_id,
                &intent.tool_name,
                ToolError::validation(e.to_string()),
            );
        }

        if cancel.is_cancelled() {
            return ToolResult::failure(&intent.call_id, &intent.tool_name, ToolError::cancelled());
        }

        info!(tool = %intent.tool_name, call_id = %intent.call_id, "Dispatching tool call");
        let started = Instant::now();
        let outcome = self
            .transport
            .call_tool(&intent.tool_name, &intent.arguments, cancel)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(value) => ToolResult::success(&intent.call_id, &intent.tool_name, value),
            Err(TransportError::Cancelled) => {
                ToolResult::failure(&intent.call_id, &intent.tool_name, ToolError::cancelled())
            }
            Err(e) => {
                warn!(tool = %intent.tool_name, call_id = %intent.call_id, "Tool call failed: {}", e);
                ToolResult::failure(&intent.call_id, &intent.tool_name, e.into_tool_error())
            }
        };
        debug!(
            tool = %intent.tool_name,
            success = result.is_success(),
            duration_ms,
            "Tool call finished"
        );
        result.with_duration(duration_ms)
    }

    /// Execute several calls concurrently. Results keep the order of `intents`.
    pub async fn dispatch_all(
        &self,
        intents: &[ToolCallIntent],
        cancel: &CancellationToken,
    ) -> Vec<ToolResult> {
        join_all(intents.iter().map(|intent| self.dispatch(intent, cancel))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use toolrelay_domain::{ErrorKind, ParamType, ToolDescriptor, ToolParameter};

    /// Answers `add_numbers` and `get_echo`; `slow_*` tools sleep first.
    #[derive(Default)]
    struct FakeTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ToolTransport for FakeTransport {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError> {
            Ok(catalog())
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: &serde_json::Map<String, serde_json::Value>,
            cancel: &CancellationToken,
        ) -> Result<serde_json::Value, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match name {
                "add_numbers" => {
                    let a = arguments["a"].as_f64().unwrap_or_default();
                    let b = arguments["b"].as_f64().unwrap_or_default();
                    Ok(json!((a + b) as i64))
                }
                "get_echo" => Ok(json!(format!(
                    "Echo from MCP: {}",
                    arguments["text"].as_str().unwrap_or_default()
                ))),
                "slow_echo" => {
                    tokio::select! {
                        _ = cancel.cancelled() => Err(TransportError::Cancelled),
                        _ = tokio::time::sleep(Duration::from_millis(50)) => {
                            Ok(arguments["text"].clone())
                        }
                    }
                }
                "list_files" => Err(TransportError::ToolExecution {
                    message: "Directory not found: /nope".into(),
                    details: None,
                }),
                _ => Err(TransportError::Protocol(format!("no such tool {name}"))),
            }
        }

        async fn close(&self) {}
    }

    fn catalog() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("add_numbers", "Add two integers.")
                .with_parameter(ToolParameter::new("a", "First", true).with_type(ParamType::Integer))
                .with_parameter(ToolParameter::new("b", "Second", true).with_type(ParamType::Integer)),
            ToolDescriptor::new("get_echo", "Echo text back.")
                .with_parameter(ToolParameter::new("text", "Text", true)),
            ToolDescriptor::new("slow_echo", "Echo after a pause.")
                .with_parameter(ToolParameter::new("text", "Text", true)),
            ToolDescriptor::new("list_files", "List a directory.")
                .with_parameter(ToolParameter::new("path", "Directory", true)),
        ]
    }

    fn dispatcher() -> (Dispatcher, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::default());
        let registry = Arc::new(ToolRegistry::from_descriptors(catalog()));
        (Dispatcher::new(registry, transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_dispatch_add_numbers() {
        let (dispatcher, _) = dispatcher();
        let intent = ToolCallIntent::new("c1", "add_numbers")
            .with_arg("a", 100)
            .with_arg("b", 55);

        let result = dispatcher.dispatch(&intent, &CancellationToken::new()).await;
        assert!(result.is_success());
        assert_eq!(result.call_id, "c1");
        assert_eq!(result.value(), Some(&json!(155)));
        assert!(result.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_dispatch_get_echo() {
        let (dispatcher, _) = dispatcher();
        let intent = ToolCallIntent::new("c2", "get_echo").with_arg("text", "155");

        let result = dispatcher.dispatch(&intent, &CancellationToken::new()).await;
        assert_eq!(result.value(), Some(&json!("Echo from MCP: 155")));
    }

    #[tokio::test]
    async fn test_unknown_tool_never_reaches_transport() {
        let (dispatcher, transport) = dispatcher();
        let intent = ToolCallIntent::new("c3", "delete_all");

        let result = dispatcher.dispatch(&intent, &CancellationToken::new()).await;
        assert!(!result.is_success());
        assert_eq!(result.error_kind(), Some(ErrorKind::ValidationError));
        assert!(result.error().unwrap().message.contains("delete_all"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_transport() {
        let (dispatcher, transport) = dispatcher();
        let intent = ToolCallIntent::new("c4", "add_numbers").with_arg("a", 1);

        let result = dispatcher.dispatch(&intent, &CancellationToken::new()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ValidationError));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_failure_becomes_failed_result() {
        let (dispatcher, _) = dispatcher();
        let intent = ToolCallIntent::new("c5", "list_files").with_arg("path", "/nope");

        let result = dispatcher.dispatch(&intent, &CancellationToken::new()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ToolExecutionError));
        assert_eq!(result.error().unwrap().message, "Directory not found: /nope");
    }

    #[tokio::test]
    async fn test_dispatch_all_keeps_intent_order() {
        let (dispatcher, _) = dispatcher();
        let intents = vec![
            ToolCallIntent::new("slow", "slow_echo").with_arg("text", "first"),
            ToolCallIntent::new("fast", "get_echo").with_arg("text", "second"),
            ToolCallIntent::new("bad", "delete_all"),
        ];

        let results = dispatcher
            .dispatch_all(&intents, &CancellationToken::new())
            .await;
        let ids: Vec<_> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["slow", "fast", "bad"]);
        assert_eq!(results[0].value(), Some(&json!("first")));
        assert!(!results[2].is_success());
    }

    #[tokio::test]
    async fn test_pre_cancelled_dispatch_skips_transport() {
        let (dispatcher, transport) = dispatcher();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let intent = ToolCallIntent::new("c6", "get_echo").with_arg("text", "x");
        let result = dispatcher.dispatch(&intent, &cancel).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::CancelledError));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_in_flight_dispatch() {
        let (dispatcher, _) = dispatcher();
        let cancel = CancellationToken::new();
        let intent = ToolCallIntent::new("c7", "slow_echo").with_arg("text", "x");

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel();
        });

        let result = dispatcher.dispatch(&intent, &cancel).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::CancelledError));
    }
}
