//! Tool server configuration from TOML (`[server]` section)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How to launch the tool process
///
/// # Example
///
/// ```toml
/// [server]
/// command = "filesystem-server"
/// args = []
/// shutdown_grace_ms = 2000
///
/// [server.env]
/// RUST_LOG = "debug"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    /// Executable to spawn (looked up on `PATH`)
    pub command: String,
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// Environment overlay for the child process
    pub env: BTreeMap<String, String>,
    /// How long `close()` waits for the child to exit before killing it
    pub shutdown_grace_ms: u64,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            command: "time-math-server".to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            shutdown_grace_ms: 2000,
        }
    }
}
