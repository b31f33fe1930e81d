//! MCP (Model Context Protocol) stdio adapter
//!
//! Talks to a tool server running as a child process: newline-delimited
//! JSON-RPC 2.0 over its stdin/stdout.
//!
//! - [`protocol`]: JSON-RPC envelopes and MCP payloads
//! - [`transport`]: framing and message classification
//! - [`router`]: request/response correlation for concurrent callers
//! - [`client`]: [`McpTransport`], the `ToolTransport` implementation

pub mod client;
pub mod error;
pub mod protocol;
pub mod router;
pub mod transport;

pub use client::{McpTransport, McpTransportConfig};
pub use error::McpError;
