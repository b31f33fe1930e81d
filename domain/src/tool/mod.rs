//! Tool domain module
//!
//! This module defines the core abstractions for calling tools that live in
//! a separate process: what a tool looks like, how a call is requested, and
//! what comes back.
//!
//! # Overview
//!
//! ```text
//! ┌────────────────┐    ┌────────────────┐    ┌──────────────┐
//! │ ToolDescriptor │───▶│ ToolCallIntent │───▶│ ToolResult   │
//! │ (catalog)      │    │ (engine)       │    │ (dispatcher) │
//! └────────────────┘    └────────────────┘    └──────────────┘
//! ```
//!
//! - [`ToolDescriptor`]: name, description and ordered parameter schema,
//!   fetched once from the tool process and immutable afterwards
//! - [`ToolCallIntent`]: a call requested by the decision engine
//! - [`ToolResult`]: normalized success value or [`ToolError`]
//! - [`ToolValidator`]: pure check of arguments against a descriptor
//!
//! # Architecture
//!
//! - **Domain** (this module): pure definitions, no I/O
//! - **Application** (`ToolTransport` port, `ToolRegistry`, `Dispatcher`)
//! - **Infrastructure** (`McpTransport`): the stdio child-process adapter

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::{ParamType, ToolCallIntent, ToolDescriptor, ToolParameter};
pub use traits::{DefaultToolValidator, ToolValidator, ValidationError};
pub use value_objects::{ErrorKind, ToolError, ToolResult};
