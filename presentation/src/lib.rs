//! Presentation layer for toolrelay
//!
//! This crate contains the CLI definition and the formatters that turn
//! conversation events into terminal output.

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, EngineArg, OutputFormat};
pub use output::console::ConsoleFormatter;
pub use output::formatter::EventFormatter;
pub use output::json::JsonFormatter;
