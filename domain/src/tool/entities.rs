//! Tool domain entities

use serde::{Deserialize, Serialize};

/// Declared type of a tool parameter.
///
/// Mirrors the JSON Schema primitive types a tool process advertises in its
/// catalog. `Any` is used when the schema omits `type` or lists several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
    Any,
}

impl ParamType {
    pub fn as_str(&self) -> &str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Null => "null",
            ParamType::Any => "any",
        }
    }

    /// Parse a JSON Schema `type` keyword. Unknown names map to `Any`.
    pub fn from_schema_name(name: &str) -> Self {
        match name {
            "string" => ParamType::String,
            "integer" => ParamType::Integer,
            "number" => ParamType::Number,
            "boolean" => ParamType::Boolean,
            "array" => ParamType::Array,
            "object" => ParamType::Object,
            "null" => ParamType::Null,
            _ => ParamType::Any,
        }
    }

    /// Whether `value` is acceptable for a parameter of this type.
    ///
    /// Integral floats (`100.0`) count as integers: decision engines routinely
    /// emit every number as a float.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match (self, value) {
            (ParamType::Any, _) => true,
            (ParamType::String, Value::String(_)) => true,
            (ParamType::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            (ParamType::Number, Value::Number(_)) => true,
            (ParamType::Boolean, Value::Bool(_)) => true,
            (ParamType::Array, Value::Array(_)) => true,
            (ParamType::Object, Value::Object(_)) => true,
            (ParamType::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Declared type
    pub param_type: ParamType,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: ParamType::String,
        }
    }

    pub fn with_type(mut self, param_type: ParamType) -> Self {
        self.param_type = param_type;
        self
    }
}

/// Description of one tool advertised by a tool process.
///
/// Immutable once fetched from the catalog; parameters keep the order the
/// tool process declared them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name of the tool within its catalog (e.g., "add_numbers")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameter specifications, in declaration order
    pub parameters: Vec<ToolParameter>,
    /// Whether arguments not listed in `parameters` are accepted.
    /// `false` only when the schema says `"additionalProperties": false`.
    #[serde(default = "default_additional_properties")]
    pub additional_properties: bool,
}

fn default_additional_properties() -> bool {
    true
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            additional_properties: true,
        }
    }

    /// Reject arguments that are not declared parameters.
    pub fn closed(mut self) -> Self {
        self.additional_properties = false;
        self
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// Build a descriptor from a JSON Schema object (`inputSchema`).
    ///
    /// Reads `properties` (in document order), the `required` list and
    /// `additionalProperties`; anything but an explicit `false` leaves the
    /// descriptor open to extra arguments.
    /// A property whose `type` is a list or missing becomes [`ParamType::Any`],
    /// except for the common `["T", "null"]` nullable form, which keeps `T`.
    pub fn from_input_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: &serde_json::Value,
    ) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        let mut descriptor = Self::new(name, description);
        descriptor.additional_properties =
            schema.get("additionalProperties") != Some(&serde_json::Value::Bool(false));
        if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
            for (param_name, prop) in properties {
                let param_type = schema_type(prop);
                let description = prop
                    .get("description")
                    .or_else(|| prop.get("title"))
                    .and_then(|d| d.as_str())
                    .unwrap_or_default();
                descriptor.parameters.push(
                    ToolParameter::new(
                        param_name.clone(),
                        description,
                        required.contains(&param_name.as_str()),
                    )
                    .with_type(param_type),
                );
            }
        }
        descriptor
    }

    /// Render the parameter list back into a JSON Schema object.
    pub fn input_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = serde_json::Map::new();
            if param.param_type != ParamType::Any {
                prop.insert("type".to_string(), serde_json::json!(param.param_type.as_str()));
            }
            if !param.description.is_empty() {
                prop.insert("description".to_string(), serde_json::json!(param.description));
            }
            properties.insert(param.name.clone(), serde_json::Value::Object(prop));
            if param.required {
                required.push(serde_json::json!(param.name));
            }
        }

        let mut schema = serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        });
        if !self.additional_properties {
            schema["additionalProperties"] = serde_json::Value::Bool(false);
        }
        schema
    }
}

fn schema_type(prop: &serde_json::Value) -> ParamType {
    match prop.get("type") {
        Some(serde_json::Value::String(s)) => ParamType::from_schema_name(s),
        Some(serde_json::Value::Array(types)) => {
            let non_null: Vec<&str> = types
                .iter()
                .filter_map(|t| t.as_str())
                .filter(|t| *t != "null")
                .collect();
            match non_null.as_slice() {
                [single] => ParamType::from_schema_name(single),
                _ => ParamType::Any,
            }
        }
        _ => ParamType::Any,
    }
}

/// A request from the decision engine to invoke a tool.
///
/// Consumed exactly once by the dispatcher. `call_id` is only used to pair
/// the intent with its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallIntent {
    /// Engine-assigned correlation id
    pub call_id: String,
    /// Name of the tool to call
    pub tool_name: String,
    /// Named arguments
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ToolCallIntent {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments: serde_json::Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Get an optional i64 argument
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.arguments.get(key).and_then(|v| v.as_i64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_type_accepts() {
        assert!(ParamType::Integer.accepts(&json!(100)));
        assert!(ParamType::Integer.accepts(&json!(100.0)));
        assert!(!ParamType::Integer.accepts(&json!(1.5)));
        assert!(!ParamType::Integer.accepts(&json!("100")));
        assert!(ParamType::Number.accepts(&json!(1.5)));
        assert!(ParamType::String.accepts(&json!("x")));
        assert!(!ParamType::String.accepts(&json!(1)));
        assert!(ParamType::Any.accepts(&json!({"nested": true})));
    }

    #[test]
    fn test_descriptor_from_input_schema() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": {"type": "integer", "title": "A"},
                "b": {"type": "integer", "description": "Second integer"},
                "note": {"type": ["string", "null"]},
                "blob": {}
            },
            "required": ["a", "b"]
        });

        let tool = ToolDescriptor::from_input_schema("add_numbers", "Add two numbers.", &schema);

        assert_eq!(tool.name, "add_numbers");
        let names: Vec<&str> = tool.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "note", "blob"]);
        assert_eq!(tool.parameter("a").unwrap().description, "A");
        assert_eq!(tool.parameter("b").unwrap().param_type, ParamType::Integer);
        assert_eq!(tool.parameter("note").unwrap().param_type, ParamType::String);
        assert!(!tool.parameter("note").unwrap().required);
        assert_eq!(tool.parameter("blob").unwrap().param_type, ParamType::Any);
        assert_eq!(tool.required_parameters().count(), 2);
    }

    #[test]
    fn test_descriptor_without_properties() {
        let tool = ToolDescriptor::from_input_schema(
            "get_current_time",
            "Get the current time",
            &json!({"type": "object"}),
        );
        assert!(tool.parameters.is_empty());
        assert!(tool.additional_properties);
    }

    #[test]
    fn test_descriptor_additional_properties() {
        let open = ToolDescriptor::from_input_schema(
            "kv",
            "Store a value",
            &json!({"type": "object", "additionalProperties": true}),
        );
        assert!(open.additional_properties);

        let closed = ToolDescriptor::from_input_schema(
            "kv",
            "Store a value",
            &json!({"type": "object", "properties": {}, "additionalProperties": false}),
        );
        assert!(!closed.additional_properties);
        assert_eq!(closed.input_schema()["additionalProperties"], json!(false));
        assert_eq!(
            ToolDescriptor::from_input_schema("kv", "Store a value", &closed.input_schema()),
            closed
        );
    }

    #[test]
    fn test_input_schema_round_trip_keeps_required() {
        let tool = ToolDescriptor::new("get_echo", "Echo")
            .with_parameter(ToolParameter::new("text", "The string to echo", true));

        let schema = tool.input_schema();
        assert_eq!(schema["properties"]["text"]["type"], "string");
        assert_eq!(schema["required"], json!(["text"]));

        let parsed = ToolDescriptor::from_input_schema("get_echo", "Echo", &schema);
        assert_eq!(parsed, tool);
    }

    #[test]
    fn test_tool_call_intent() {
        let intent = ToolCallIntent::new("call-1", "add_numbers")
            .with_arg("a", 100)
            .with_arg("b", 55);

        assert_eq!(intent.tool_name, "add_numbers");
        assert_eq!(intent.get_i64("a"), Some(100));
        assert_eq!(intent.get_string("a"), None);
    }
}
