//! Runner configuration from TOML (`[runner]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRunnerConfig {
    /// Per-request deadline for the tool process, in milliseconds
    pub timeout_ms: u64,
    /// Maximum dispatched tool-call rounds per turn
    pub max_tool_rounds: usize,
    /// Abort startup when the tool process advertises no tools
    pub catalog_required: bool,
}

impl Default for FileRunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_tool_rounds: 5,
            catalog_required: true,
        }
    }
}
