//! Decision engine adapters
//!
//! Implementations of the [`DecisionEngine`](toolrelay_application::DecisionEngine)
//! port:
//!
//! - [`ScriptedEngine`]: replays a scripted conversation; deterministic and
//!   offline, used for demos and tests
//! - `GeminiEngine`: Gemini `generateContent` REST API (feature `gemini`)
//!
//! Credentials reach an adapter only through [`EngineConfig`], which is
//! built once at startup. Adapters never read the environment themselves.

pub mod scripted;

#[cfg(feature = "gemini")]
pub mod gemini;

pub use scripted::{Script, ScriptRound, ScriptedCall, ScriptedEngine};

#[cfg(feature = "gemini")]
pub use gemini::GeminiEngine;

/// Instruction handed to model-backed engines when none is configured.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant powered by external \
MCP tools. Use the available tools to answer user questions. Always calculate numbers with \
'add_numbers', always get the current time with 'get_current_time', and then echo the result \
with 'get_echo'.";

/// Runtime configuration for model-backed engines.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: String,
    /// Resolved API key, if any
    pub api_key: Option<String>,
    pub use_vertexai: bool,
    pub system_instruction: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-lite".to_string(),
            api_key: None,
            use_vertexai: false,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}
