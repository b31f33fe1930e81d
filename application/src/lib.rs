//! Application layer for toolrelay
//!
//! This crate contains use cases, port definitions, the tool registry and
//! dispatcher, and application configuration. It depends only on the
//! domain layer.

pub mod config;
pub mod ports;
pub mod tools;
pub mod use_cases;

// Re-export commonly used types
pub use config::RunnerParams;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    decision_engine::{DecisionEngine, EngineError, FragmentSender, FragmentStream},
    tool_transport::{ToolTransport, TransportError},
};
pub use tools::{Dispatcher, RegistryError, ToolRegistry};
pub use use_cases::run_turn::{RunTurnError, RunTurnUseCase, TurnHandle, TurnState};
