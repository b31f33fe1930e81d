//! Configuration file loading for toolrelay
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./toolrelay.toml` or `./.toolrelay.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/toolrelay/config.toml`
//! 4. Fallback: `~/.config/toolrelay/config.toml`
//! 5. Default values
//!
//! CLI flags are applied on top by the binary.

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, EngineKind, FileConfig, FileEngineConfig, FileLoggingConfig,
    FileRunnerConfig, FileServerConfig,
};
pub use loader::ConfigLoader;
