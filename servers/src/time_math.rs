//! Time and arithmetic tools (`TimeAndMathServer`)

use crate::server::{ToolFailure, ToolHandler, ToolServer, integer_arg, string_arg};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use toolrelay_domain::{ParamType, ToolDescriptor, ToolParameter};

/// Format used by `get_current_time` (day/month/year hour:minute).
pub const TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

pub struct AddNumbers;

#[async_trait]
impl ToolHandler for AddNumbers {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("add_numbers", "Add two numbers.")
            .with_parameter(
                ToolParameter::new("a", "First integer.", true).with_type(ParamType::Integer),
            )
            .with_parameter(
                ToolParameter::new("b", "Second integer.", true).with_type(ParamType::Integer),
            )
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value, ToolFailure> {
        let a = integer_arg(arguments, "a")?;
        let b = integer_arg(arguments, "b")?;
        a.checked_add(b)
            .map(|sum| json!(sum))
            .ok_or_else(|| ToolFailure::Domain(format!("{} + {} overflows", a, b)))
    }
}

pub struct GetEcho;

#[async_trait]
impl ToolHandler for GetEcho {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("get_echo", "Echoes the input text back with a prefix.").with_parameter(
            ToolParameter::new("text", "The string to echo.", true).with_type(ParamType::String),
        )
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value, ToolFailure> {
        let text = string_arg(arguments, "text")?;
        Ok(json!(format!("Echo from MCP: {}", text)))
    }
}

pub struct GetCurrentTime;

#[async_trait]
impl ToolHandler for GetCurrentTime {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("get_current_time", "Get the current time")
    }

    async fn call(&self, _arguments: &Map<String, Value>) -> Result<Value, ToolFailure> {
        Ok(json!(chrono::Local::now().format(TIME_FORMAT).to_string()))
    }
}

pub fn server() -> ToolServer {
    ToolServer::new("TimeAndMathServer", env!("CARGO_PKG_VERSION"))
        .with_tool(AddNumbers)
        .with_tool(GetEcho)
        .with_tool(GetCurrentTime)
}
