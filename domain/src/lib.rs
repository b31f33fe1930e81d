//! Domain layer for toolrelay
//!
//! This crate contains the core entities and value objects of the
//! tool-invocation subsystem. It has no dependencies on infrastructure or
//! presentation concerns.
//!
//! # Core Concepts
//!
//! - **Tool**: a named capability living in a separate process, described by
//!   a [`ToolDescriptor`] and invoked through a [`ToolCallIntent`]
//! - **Turn**: one user-message-to-final-answer cycle, possibly spanning
//!   several tool-call rounds, reported as a sequence of [`OutputEvent`]s
//! - **Session**: the identity and append-only history of one conversation

pub mod session;
pub mod tool;

// Re-export commonly used types
pub use session::{
    entities::{Message, Session, current_turn},
    stream::{Fragment, OutputEvent},
};
pub use tool::{
    entities::{ParamType, ToolCallIntent, ToolDescriptor, ToolParameter},
    traits::{DefaultToolValidator, ToolValidator, ValidationError},
    value_objects::{ErrorKind, ToolError, ToolResult},
};
