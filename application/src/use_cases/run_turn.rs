//! Run Turn use case
//!
//! Drives one user turn through the conversation loop:
//!
//! ```text
//! AwaitingModel ──▶ StreamingText ──┐
//!      ▲   │                        ├──▶ Done
//!      │   └──▶ PendingToolCalls ───┘
//!      └──────────────┘
//! ```
//!
//! 1. Append the user message to the session
//! 2. Ask the [`DecisionEngine`] with history + catalog
//! 3. Forward text fragments; dispatch tool-call fragments and record results
//! 4. Repeat until an engine invocation requests no tools
//!
//! Every turn ends with exactly one terminal [`OutputEvent`].

use crate::config::RunnerParams;
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger};
use crate::ports::decision_engine::{DecisionEngine, EngineError, FragmentStream};
use crate::tools::Dispatcher;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toolrelay_domain::{ErrorKind, Fragment, OutputEvent, Session, ToolCallIntent};
use tracing::{debug, info, warn};

/// Errors surfaced by [`TurnHandle::finish`]
#[derive(Error, Debug)]
pub enum RunTurnError {
    #[error("Turn task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Where the conversation loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingModel,
    StreamingText,
    PendingToolCalls,
    Done,
}

impl TurnState {
    fn transition(&mut self, next: TurnState) {
        if *self != next {
            let from = *self;
            debug!(?from, to = ?next, "Turn state change");
            *self = next;
        }
    }
}

/// A turn running in the background.
///
/// Events arrive in order on [`next_event`](Self::next_event); the session is
/// handed back by [`finish`](Self::finish) once the turn is over.
pub struct TurnHandle {
    events: mpsc::UnboundedReceiver<OutputEvent>,
    task: JoinHandle<Session>,
}

impl TurnHandle {
    /// Next event of the turn, or `None` after the terminal event.
    pub async fn next_event(&mut self) -> Option<OutputEvent> {
        self.events.recv().await
    }

    /// Wait for the turn to end and take the session back.
    pub async fn finish(self) -> Result<Session, RunTurnError> {
        Ok(self.task.await?)
    }
}

/// Use case for running user turns against a decision engine and a tool process
pub struct RunTurnUseCase {
    engine: Arc<dyn DecisionEngine>,
    dispatcher: Arc<Dispatcher>,
    params: RunnerParams,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl RunTurnUseCase {
    pub fn new(engine: Arc<dyn DecisionEngine>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            engine,
            dispatcher,
            params: RunnerParams::default(),
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_params(mut self, params: RunnerParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn params(&self) -> &RunnerParams {
        &self.params
    }

    /// Spawn a turn on the runtime and return a handle to its events.
    pub fn start_turn(
        self: &Arc<Self>,
        mut session: Session,
        user_message: impl Into<String>,
        cancel: CancellationToken,
    ) -> TurnHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = Arc::clone(self);
        let user_message = user_message.into();
        let task = tokio::spawn(async move {
            runner
                .run_turn(&mut session, &user_message, &tx, &cancel)
                .await;
            session
        });
        TurnHandle { events: rx, task }
    }

    /// Run one turn to completion. Returns the terminal event, which has
    /// also been sent on `events`.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        user_message: &str,
        events: &mpsc::UnboundedSender<OutputEvent>,
        cancel: &CancellationToken,
    ) -> OutputEvent {
        info!(
            session_id = %session.session_id(),
            engine = %self.engine.name(),
            "Starting turn"
        );
        session.add_user_message(user_message);
        self.conversation_logger.log(ConversationEvent::new(
            "user_message",
            json!({
                "user_id": session.user_id(),
                "session_id": session.session_id(),
                "text": user_message,
            }),
        ));

        let mut state = TurnState::AwaitingModel;
        let mut rounds = 0usize;

        let terminal = loop {
            state.transition(TurnState::AwaitingModel);
            if cancel.is_cancelled() {
                break cancelled_event();
            }

            let stream = tokio::select! {
                biased;
                _ = cancel.cancelled() => break cancelled_event(),
                response = self.engine.respond(session.history(), self.dispatcher.registry().describe()) => response,
            };
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => break engine_error_event(&e),
            };

            match self
                .consume_invocation(session, stream, &mut rounds, &mut state, events, cancel)
                .await
            {
                Invocation::Finished { dispatched: true } => continue,
                Invocation::Finished { dispatched: false } => {
                    break OutputEvent::Completed { rounds };
                }
                Invocation::Ended(event) => break event,
            }
        };

        state.transition(TurnState::Done);
        self.finish(session, terminal, rounds, events)
    }

    /// Consume the fragments of one engine invocation.
    async fn consume_invocation(
        &self,
        session: &mut Session,
        mut stream: FragmentStream,
        rounds: &mut usize,
        state: &mut TurnState,
        events: &mpsc::UnboundedSender<OutputEvent>,
        cancel: &CancellationToken,
    ) -> Invocation {
        let mut dispatched = false;
        let mut text = String::new();

        loop {
            let fragment = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.flush_text(session, &mut text);
                    return Invocation::Ended(cancelled_event());
                }
                fragment = stream.next() => fragment,
            };

            match fragment {
                None => break,
                Some(Err(e)) => {
                    self.flush_text(session, &mut text);
                    return Invocation::Ended(engine_error_event(&e));
                }
                Some(Ok(Fragment::Text(chunk))) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    state.transition(TurnState::StreamingText);
                    text.push_str(&chunk);
                    let _ = events.send(OutputEvent::Text(chunk));
                }
                Some(Ok(Fragment::ToolCalls(intents))) => {
                    if intents.is_empty() {
                        continue;
                    }
                    self.flush_text(session, &mut text);

                    if !dispatched {
                        if *rounds >= self.params.max_tool_rounds {
                            warn!(
                                max_tool_rounds = self.params.max_tool_rounds,
                                tool = %intents[0].tool_name,
                                "Tool round limit reached"
                            );
                            return Invocation::Ended(OutputEvent::error(
                                ErrorKind::RunawayToolLoopError,
                                format!(
                                    "Engine kept requesting tools after {} rounds",
                                    self.params.max_tool_rounds
                                ),
                            ));
                        }
                        *rounds += 1;
                        dispatched = true;
                    }

                    state.transition(TurnState::PendingToolCalls);
                    self.run_tool_calls(session, intents, *rounds, events, cancel)
                        .await;

                    if cancel.is_cancelled() {
                        return Invocation::Ended(cancelled_event());
                    }
                }
            }
        }

        self.flush_text(session, &mut text);
        Invocation::Finished { dispatched }
    }

    /// Record, dispatch and record the results of one tool-call fragment.
    async fn run_tool_calls(
        &self,
        session: &mut Session,
        intents: Vec<ToolCallIntent>,
        round: usize,
        events: &mpsc::UnboundedSender<OutputEvent>,
        cancel: &CancellationToken,
    ) {
        debug!(round, calls = intents.len(), "Dispatching tool calls");
        for intent in &intents {
            let _ = events.send(OutputEvent::ToolInvoked(intent.clone()));
            self.conversation_logger.log(ConversationEvent::new(
                "tool_call",
                json!({
                    "round": round,
                    "call_id": intent.call_id,
                    "tool": intent.tool_name,
                    "arguments": intent.arguments,
                }),
            ));
            session.add_tool_call(intent.clone());
        }

        let results = self.dispatcher.dispatch_all(&intents, cancel).await;

        for result in results {
            self.conversation_logger.log(ConversationEvent::new(
                "tool_result",
                json!({
                    "round": round,
                    "call_id": result.call_id,
                    "tool": result.tool_name,
                    "success": result.success,
                    "output": result.to_engine_payload(),
                    "duration_ms": result.duration_ms,
                }),
            ));
            session.add_tool_result(result.clone());
            let _ = events.send(OutputEvent::ToolCompleted(result));
        }
    }

    fn flush_text(&self, session: &mut Session, text: &mut String) {
        if text.is_empty() {
            return;
        }
        let text = std::mem::take(text);
        self.conversation_logger.log(ConversationEvent::new(
            "assistant_text",
            json!({ "text": text }),
        ));
        session.add_assistant_text(text);
    }

    fn finish(
        &self,
        session: &Session,
        terminal: OutputEvent,
        rounds: usize,
        events: &mpsc::UnboundedSender<OutputEvent>,
    ) -> OutputEvent {
        match &terminal {
            OutputEvent::Error { kind, message } => {
                warn!(kind = %kind, rounds, "Turn ended with error: {}", message);
                self.conversation_logger.log(ConversationEvent::new(
                    "turn_end",
                    json!({
                        "session_id": session.session_id(),
                        "rounds": rounds,
                        "error": { "kind": kind.as_str(), "message": message },
                    }),
                ));
            }
            _ => {
                info!(rounds, "Turn completed");
                self.conversation_logger.log(ConversationEvent::new(
                    "turn_end",
                    json!({ "session_id": session.session_id(), "rounds": rounds }),
                ));
            }
        }
        let _ = events.send(terminal.clone());
        terminal
    }
}

/// How one engine invocation ended.
enum Invocation {
    /// The stream ran out; `dispatched` tells whether it requested tools.
    Finished { dispatched: bool },
    /// The turn must stop with this terminal event.
    Ended(OutputEvent),
}

fn cancelled_event() -> OutputEvent {
    OutputEvent::error(ErrorKind::CancelledError, "Turn cancelled")
}

fn engine_error_event(error: &EngineError) -> OutputEvent {
    OutputEvent::error(ErrorKind::EngineError, error.to_string())
}
