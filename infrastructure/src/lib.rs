//! Infrastructure layer for toolrelay
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the MCP stdio transport, decision engines,
//! the JSONL conversation logger and configuration file loading.

pub mod config;
pub mod engine;
pub mod logging;
pub mod mcp;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, EngineKind, FileConfig, FileEngineConfig,
    FileLoggingConfig, FileRunnerConfig, FileServerConfig,
};
#[cfg(feature = "gemini")]
pub use engine::GeminiEngine;
pub use engine::{DEFAULT_SYSTEM_INSTRUCTION, EngineConfig, Script, ScriptRound, ScriptedCall, ScriptedEngine};
pub use logging::JsonlConversationLogger;
pub use mcp::{McpError, McpTransport, McpTransportConfig};
