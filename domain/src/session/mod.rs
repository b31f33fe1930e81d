//! Conversation session domain.
//!
//! - [`entities::Session`]: identity plus append-only history of one conversation
//! - [`entities::Message`]: a single history entry
//! - [`stream::Fragment`]: a piece of a decision-engine response
//! - [`stream::OutputEvent`]: what a running turn reports to its caller

pub mod entities;
pub mod stream;
