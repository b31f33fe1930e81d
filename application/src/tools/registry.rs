//! Tool registry
//!
//! Holds the catalog advertised by the tool process. The catalog is fetched
//! once per connection and never changes afterwards.

use crate::ports::tool_transport::{ToolTransport, TransportError};
use std::collections::HashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use toolrelay_domain::{DefaultToolValidator, ErrorKind, ToolDescriptor, ToolValidator, ValidationError};
use tracing::{debug, warn};

/// Errors that can occur while loading the catalog
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Failed to fetch tool catalog: {0}")]
    Transport(#[from] TransportError),

    #[error("Tool process advertised no tools")]
    EmptyCatalog,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Transport(e) => e.kind(),
            RegistryError::EmptyCatalog => ErrorKind::EmptyCatalogError,
        }
    }
}

/// Typed lookup table over the tool catalog.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
    validator: DefaultToolValidator,
}

impl ToolRegistry {
    /// Fetch the catalog from the transport.
    ///
    /// Returns [`RegistryError::EmptyCatalog`] when the process advertises
    /// nothing; callers that tolerate that fall back to [`ToolRegistry::empty`].
    pub async fn load(transport: &dyn ToolTransport) -> Result<Self, RegistryError> {
        let descriptors = transport.list_tools().await?;
        let registry = Self::from_descriptors(descriptors);
        if registry.is_empty() {
            return Err(RegistryError::EmptyCatalog);
        }
        debug!(tools = registry.len(), "Loaded tool catalog");
        Ok(registry)
    }

    /// Like [`ToolRegistry::load`], but gives up with
    /// [`TransportError::Cancelled`] as soon as `cancel` fires.
    pub async fn load_with_cancel(
        transport: &dyn ToolTransport,
        cancel: &CancellationToken,
    ) -> Result<Self, RegistryError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Catalog load cancelled");
                Err(RegistryError::Transport(TransportError::Cancelled))
            }
            loaded = Self::load(transport) => loaded,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a registry from descriptors. On duplicate names the first one wins.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        let mut registry = Self::default();
        for descriptor in descriptors {
            if registry.index.contains_key(&descriptor.name) {
                warn!(tool = %descriptor.name, "Duplicate tool in catalog, keeping the first");
                continue;
            }
            registry
                .index
                .insert(descriptor.name.clone(), registry.tools.len());
            registry.tools.push(descriptor);
        }
        registry
    }

    /// The catalog in the order the tool process advertised it.
    pub fn describe(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&idx| &self.tools[idx])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check a call against the catalog without executing anything.
    pub fn validate(
        &self,
        name: &str,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), ValidationError> {
        let descriptor = self.get(name).ok_or_else(|| ValidationError::UnknownTool {
            name: name.to_string(),
            available: if self.is_empty() {
                "none".to_string()
            } else {
                self.names().collect::<Vec<_>>().join(", ")
            },
        })?;
        self.validator.validate(descriptor, arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use toolrelay_domain::{ParamType, ToolCallIntent, ToolParameter};

    fn catalog() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("add_numbers", "Add two integers.")
                .with_parameter(ToolParameter::new("a", "First", true).with_type(ParamType::Integer))
                .with_parameter(ToolParameter::new("b", "Second", true).with_type(ParamType::Integer)),
            ToolDescriptor::new("get_echo", "Echo text back.")
                .with_parameter(ToolParameter::new("text", "Text to echo", true)),
            ToolDescriptor::new("get_current_time", "Current local time."),
        ]
    }

    struct CatalogTransport(Result<Vec<ToolDescriptor>, TransportError>);

    #[async_trait]
    impl ToolTransport for CatalogTransport {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError> {
            self.0.clone()
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: &serde_json::Map<String, serde_json::Value>,
            _cancel: &CancellationToken,
        ) -> Result<serde_json::Value, TransportError> {
            unreachable!("registry never calls tools")
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn test_load_keeps_catalog_order() {
        let registry = ToolRegistry::load(&CatalogTransport(Ok(catalog())))
            .await
            .unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["add_numbers", "get_echo", "get_current_time"]);
        assert_eq!(registry.describe(), catalog().as_slice());
    }

    #[tokio::test]
    async fn test_load_empty_catalog() {
        let err = ToolRegistry::load(&CatalogTransport(Ok(vec![])))
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::EmptyCatalog);
        assert_eq!(err.kind(), ErrorKind::EmptyCatalogError);
    }

    #[tokio::test]
    async fn test_load_transport_failure() {
        let err = ToolRegistry::load(&CatalogTransport(Err(TransportError::Closed)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClosedError);
    }

    /// Never answers `tools/list`.
    struct SilentTransport;

    #[async_trait]
    impl ToolTransport for SilentTransport {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, TransportError> {
            std::future::pending().await
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: &serde_json::Map<String, serde_json::Value>,
            _cancel: &CancellationToken,
        ) -> Result<serde_json::Value, TransportError> {
            unreachable!("registry never calls tools")
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn test_load_with_cancel_stops_waiting() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            ToolRegistry::load_with_cancel(&SilentTransport, &cancel),
        )
        .await
        .expect("load should stop once cancelled")
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CancelledError);
    }

    #[tokio::test]
    async fn test_load_with_cancel_passes_catalog_through() {
        let registry =
            ToolRegistry::load_with_cancel(&CatalogTransport(Ok(catalog())), &CancellationToken::new())
                .await
                .unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_names_first_wins() {
        let mut descriptors = catalog();
        descriptors.push(ToolDescriptor::new("get_echo", "Shadowing echo"));
        let registry = ToolRegistry::from_descriptors(descriptors);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("get_echo").unwrap().description, "Echo text back.");
    }

    #[test]
    fn test_validate_unknown_tool_lists_available() {
        let registry = ToolRegistry::from_descriptors(catalog());
        let err = registry
            .validate("delete_all", &serde_json::Map::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown tool 'delete_all' (available: add_numbers, get_echo, get_current_time)"
        );
    }

    #[test]
    fn test_validate_well_formed_calls() {
        let registry = ToolRegistry::from_descriptors(catalog());
        let add = ToolCallIntent::new("c1", "add_numbers")
            .with_arg("a", 100)
            .with_arg("b", json!(55.0));
        let echo = ToolCallIntent::new("c2", "get_echo").with_arg("text", "155");

        assert!(registry.validate(&add.tool_name, &add.arguments).is_ok());
        assert!(registry.validate(&echo.tool_name, &echo.arguments).is_ok());
        assert!(registry
            .validate("get_current_time", &serde_json::Map::new())
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_fractional_integer() {
        let registry = ToolRegistry::from_descriptors(catalog());
        let add = ToolCallIntent::new("c1", "add_numbers")
            .with_arg("a", json!(1.5))
            .with_arg("b", 2);
        assert!(matches!(
            registry.validate(&add.tool_name, &add.arguments),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_respects_additional_properties() {
        let registry = ToolRegistry::from_descriptors(vec![
            ToolDescriptor::from_input_schema(
                "kv",
                "Store a value",
                &json!({"type": "object", "additionalProperties": true}),
            ),
            ToolDescriptor::from_input_schema(
                "strict_echo",
                "Echo text back.",
                &json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"],
                    "additionalProperties": false
                }),
            ),
        ]);

        let kv = ToolCallIntent::new("c1", "kv").with_arg("key", "x");
        assert!(registry.validate(&kv.tool_name, &kv.arguments).is_ok());

        let echo = ToolCallIntent::new("c2", "strict_echo")
            .with_arg("text", "hi")
            .with_arg("loud", true);
        assert!(matches!(
            registry.validate(&echo.tool_name, &echo.arguments),
            Err(ValidationError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_empty_registry_validation() {
        let registry = ToolRegistry::empty();
        let err = registry
            .validate("anything", &serde_json::Map::new())
            .unwrap_err();
        assert!(err.to_string().contains("available: none"));
    }
}
