//! Output formatter trait

use toolrelay_domain::{OutputEvent, ToolDescriptor};

/// Renders the pieces of a conversation for stdout.
///
/// Each method returns the exact text to print (no implicit newline), or
/// `None` when the formatter shows nothing for that item.
pub trait EventFormatter {
    /// The user's request, before the turn starts
    fn format_user(&self, query: &str) -> Option<String>;

    /// Printed once before the first event of a turn
    fn format_turn_start(&self) -> Option<String>;

    /// One event of a running turn
    fn format_event(&self, event: &OutputEvent) -> Option<String>;

    /// The tool catalog (for `--list-tools`)
    fn format_catalog(&self, tools: &[ToolDescriptor]) -> String;

    /// Printed when the tool server connection is being closed
    fn format_closing(&self) -> Option<String>;
}
