//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly; conversion into runtime types
//! ([`RunnerParams`], [`McpTransportConfig`], [`EngineConfig`]) happens here
//! so the binary never touches raw values.
//!
//! [`EngineConfig`]: crate::engine::EngineConfig

mod engine;
mod logging;
mod runner;
mod server;

pub use engine::{EngineKind, FileEngineConfig};
pub use logging::FileLoggingConfig;
pub use runner::FileRunnerConfig;
pub use server::FileServerConfig;

use crate::mcp::McpTransportConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use toolrelay_application::RunnerParams;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("runner.timeout_ms cannot be 0")]
    InvalidTimeout,

    #[error("runner.max_tool_rounds cannot be 0")]
    InvalidMaxToolRounds,

    #[error("server.command cannot be empty")]
    EmptyServerCommand,

    #[error("engine.model cannot be empty")]
    EmptyModelName,
}

/// Complete configuration file
///
/// # Example
///
/// ```toml
/// [server]
/// command = "time-math-server"
///
/// [runner]
/// timeout_ms = 30000
/// max_tool_rounds = 5
///
/// [engine]
/// kind = "script"
/// script = "demos/calculate.toml"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Tool server launch parameters
    pub server: FileServerConfig,
    /// Conversation runner limits
    pub runner: FileRunnerConfig,
    /// Decision engine selection
    pub engine: FileEngineConfig,
    /// Transcript settings
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.runner.timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }
        if self.runner.max_tool_rounds == 0 {
            return Err(ConfigValidationError::InvalidMaxToolRounds);
        }
        if self.server.command.trim().is_empty() {
            return Err(ConfigValidationError::EmptyServerCommand);
        }
        if self.engine.kind == EngineKind::Gemini && self.engine.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName);
        }
        Ok(())
    }

    pub fn runner_params(&self) -> RunnerParams {
        RunnerParams::default()
            .with_max_tool_rounds(self.runner.max_tool_rounds)
            .with_catalog_required(self.runner.catalog_required)
    }

    pub fn transport_config(&self) -> McpTransportConfig {
        McpTransportConfig::default()
            .with_request_timeout(Duration::from_millis(self.runner.timeout_ms))
            .with_shutdown_grace(Duration::from_millis(self.server.shutdown_grace_ms))
    }
}
