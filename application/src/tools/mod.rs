//! Tool catalog and call routing.
//!
//! - [`ToolRegistry`]: the catalog fetched from the tool process, used for
//!   lookups and argument validation
//! - [`Dispatcher`]: validates a [`ToolCallIntent`](toolrelay_domain::ToolCallIntent)
//!   and sends it over the [`ToolTransport`](crate::ports::tool_transport::ToolTransport)

pub mod dispatcher;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use registry::{RegistryError, ToolRegistry};
