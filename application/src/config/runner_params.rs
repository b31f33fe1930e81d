//! Runner parameters: conversation loop control.
//!
//! [`RunnerParams`] groups the static parameters that control the loop in
//! [`RunTurnUseCase`](crate::use_cases::run_turn::RunTurnUseCase).

use serde::{Deserialize, Serialize};

/// Conversation loop control parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerParams {
    /// Maximum number of tool-call rounds within one user turn.
    pub max_tool_rounds: usize,
    /// Whether an empty tool catalog aborts session setup.
    pub catalog_required: bool,
}

impl Default for RunnerParams {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            catalog_required: true,
        }
    }
}

impl RunnerParams {
    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }

    pub fn with_catalog_required(mut self, required: bool) -> Self {
        self.catalog_required = required;
        self
    }
}
