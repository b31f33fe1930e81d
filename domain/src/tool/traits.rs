//! Tool domain traits
//!
//! Contains pure domain logic traits for tool validation.
//! The async transport port is defined in the application layer (ports).

use super::entities::ToolDescriptor;
use thiserror::Error;

/// Why a tool call was rejected before reaching the tool process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown tool '{name}' (available: {available})")]
    UnknownTool { name: String, available: String },

    #[error("Missing required parameter '{parameter}' for tool '{tool}'")]
    MissingParameter { tool: String, parameter: String },

    #[error("Unknown parameter '{parameter}' for tool '{tool}'")]
    UnknownParameter { tool: String, parameter: String },

    #[error("Parameter '{parameter}' of tool '{tool}' expects {expected}, got {actual}")]
    TypeMismatch {
        tool: String,
        parameter: String,
        expected: String,
        actual: String,
    },
}

/// Validator for tool arguments
///
/// This is a pure domain trait that validates arguments against a
/// descriptor without any I/O operations.
pub trait ToolValidator {
    /// Validate arguments against the descriptor of the tool they target
    fn validate(
        &self,
        descriptor: &ToolDescriptor,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), ValidationError>;
}

/// Default implementation of ToolValidator
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(
        &self,
        descriptor: &ToolDescriptor,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), ValidationError> {
        // Required parameters must be present and non-null
        for param in descriptor.required_parameters() {
            match arguments.get(&param.name) {
                None | Some(serde_json::Value::Null) => {
                    return Err(ValidationError::MissingParameter {
                        tool: descriptor.name.clone(),
                        parameter: param.name.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        for (arg_name, value) in arguments {
            let Some(param) = descriptor.parameter(arg_name) else {
                if descriptor.additional_properties {
                    continue;
                }
                return Err(ValidationError::UnknownParameter {
                    tool: descriptor.name.clone(),
                    parameter: arg_name.clone(),
                });
            };

            // An explicit null on an optional parameter means "not provided"
            if value.is_null() && !param.required {
                continue;
            }

            if !param.param_type.accepts(value) {
                return Err(ValidationError::TypeMismatch {
                    tool: descriptor.name.clone(),
                    parameter: arg_name.clone(),
                    expected: param.param_type.to_string(),
                    actual: json_type_name(value).to_string(),
                });
            }
        }

        Ok(())
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
