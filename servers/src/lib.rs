//! Demo MCP tool servers for toolrelay
//!
//! A small stdio MCP server ([`server::ToolServer`]) plus the tool sets it
//! is shipped with:
//!
//! - [`time_math`]: `add_numbers`, `get_echo`, `get_current_time`
//! - [`filesystem`]: `list_files`
//!
//! The binaries `time-math-server` and `filesystem-server` serve these over
//! stdin/stdout; diagnostics go to stderr.

pub mod filesystem;
pub mod server;
pub mod time_math;

pub use server::{ToolFailure, ToolHandler, ToolServer};

/// Install a stderr-only tracing subscriber (stdout carries the protocol).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
