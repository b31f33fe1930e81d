//! Application-level configuration.
//!
//! - [`RunnerParams`]: conversation loop control (tool rounds, catalog policy)

pub mod runner_params;

pub use runner_params::RunnerParams;
