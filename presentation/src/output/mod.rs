//! Rendering of turn events

pub mod console;
pub mod formatter;
pub mod json;
