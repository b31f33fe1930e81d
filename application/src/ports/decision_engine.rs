//! Decision Engine port
//!
//! Defines the interface for the component that decides what to say and
//! which tools to call. Given the history and the catalog it produces a
//! [`FragmentStream`]: a finite, non-restartable sequence consumed in order.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use toolrelay_domain::{Fragment, Message, ToolDescriptor};

/// Errors that can occur while asking the decision engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Engine configuration error: {0}")]
    Configuration(String),

    #[error("Engine request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Sending half of a [`FragmentStream`], held by engine implementations.
pub type FragmentSender = mpsc::Sender<Result<Fragment, EngineError>>;

/// Handle for receiving fragments from one engine invocation.
///
/// Wraps an `mpsc::Receiver`; the stream ends when the engine drops its
/// sender. An `Err` item ends the invocation with a failure.
pub struct FragmentStream {
    receiver: mpsc::Receiver<Result<Fragment, EngineError>>,
}

impl FragmentStream {
    pub fn new(receiver: mpsc::Receiver<Result<Fragment, EngineError>>) -> Self {
        Self { receiver }
    }

    /// Create a connected sender/stream pair.
    pub fn channel(buffer: usize) -> (FragmentSender, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self::new(rx))
    }

    /// Build a stream that yields the given fragments and then ends.
    pub fn from_fragments(fragments: Vec<Fragment>) -> Self {
        let (tx, stream) = Self::channel(fragments.len());
        for fragment in fragments {
            // Capacity equals the fragment count, so this never fails.
            let _ = tx.try_send(Ok(fragment));
        }
        stream
    }

    /// Receive the next fragment, or `None` once the engine is done.
    pub async fn next(&mut self) -> Option<Result<Fragment, EngineError>> {
        self.receiver.recv().await
    }
}

/// The external component that turns history + catalog into a response.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    /// Short identifier used in logs (e.g. "script", "gemini:gemini-2.5-flash-lite").
    fn name(&self) -> &str;

    /// Start one invocation. The returned stream carries the response.
    async fn respond(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<FragmentStream, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolrelay_domain::ToolCallIntent;

    #[tokio::test]
    async fn from_fragments_yields_in_order_then_ends() {
        let mut stream = FragmentStream::from_fragments(vec![
            Fragment::text("a"),
            Fragment::tool_call(ToolCallIntent::new("c1", "get_current_time")),
            Fragment::text("b"),
        ]);

        assert_eq!(stream.next().await, Some(Ok(Fragment::text("a"))));
        assert!(matches!(
            stream.next().await,
            Some(Ok(Fragment::ToolCalls(calls))) if calls.len() == 1
        ));
        assert_eq!(stream.next().await, Some(Ok(Fragment::text("b"))));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn channel_carries_engine_error_after_text() {
        let (tx, mut stream) = FragmentStream::channel(2);
        tx.send(Ok(Fragment::text("partial"))).await.unwrap();
        tx.send(Err(EngineError::RequestFailed("503".into())))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(stream.next().await, Some(Ok(Fragment::text("partial"))));
        assert_eq!(
            stream.next().await,
            Some(Err(EngineError::RequestFailed("503".into())))
        );
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn empty_stream_ends_immediately() {
        let mut stream = FragmentStream::from_fragments(vec![]);
        assert_eq!(stream.next().await, None);
    }
}
