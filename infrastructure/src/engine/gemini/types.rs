//! Conversions between domain types and the Gemini REST JSON format
//!
//! Requests carry `contents` (alternating `user`/`model` turns made of
//! `parts`), `tools[].functionDeclarations` and a `systemInstruction`.
//! Responses are read from `candidates[0].content.parts`.

use serde_json::{Map, Value, json};
use toolrelay_application::EngineError;
use toolrelay_domain::{Fragment, Message, ParamType, ToolCallIntent, ToolDescriptor};

// ─── Domain → Gemini ─────────────────────────────────────────────

/// Gemini's schema dialect has no `null`/`any` types and needs `items`
/// for arrays.
fn parameter_schema(param_type: ParamType, description: &str) -> Value {
    let mut schema = match param_type {
        ParamType::Array => json!({ "type": "array", "items": { "type": "string" } }),
        ParamType::Null | ParamType::Any => json!({ "type": "string" }),
        other => json!({ "type": other.as_str() }),
    };
    if !description.is_empty() {
        schema["description"] = json!(description);
    }
    schema
}

/// Build one function declaration per catalog entry.
pub fn function_declarations(tools: &[ToolDescriptor]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            let mut declaration = json!({
                "name": tool.name,
                "description": tool.description,
            });
            if !tool.parameters.is_empty() {
                let properties: Map<String, Value> = tool
                    .parameters
                    .iter()
                    .map(|p| (p.name.clone(), parameter_schema(p.param_type, &p.description)))
                    .collect();
                let required: Vec<&str> = tool
                    .required_parameters()
                    .map(|p| p.name.as_str())
                    .collect();
                declaration["parameters"] = json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                });
            }
            declaration
        })
        .collect()
}

fn push_part(contents: &mut Vec<Value>, role: &str, part: Value) {
    if let Some(last) = contents.last_mut()
        && last["role"] == role
        && let Some(parts) = last["parts"].as_array_mut()
    {
        parts.push(part);
        return;
    }
    contents.push(json!({ "role": role, "parts": [part] }));
}

/// Map history onto Gemini `contents`, merging consecutive parts of the
/// same role into one entry.
pub fn history_to_contents(history: &[Message]) -> Vec<Value> {
    let mut contents = Vec::new();
    for message in history {
        match message {
            Message::User { text } => push_part(&mut contents, "user", json!({ "text": text })),
            Message::AssistantText { text } => {
                push_part(&mut contents, "model", json!({ "text": text }))
            }
            Message::ToolCall(intent) => push_part(
                &mut contents,
                "model",
                json!({
                    "functionCall": {
                        "id": intent.call_id,
                        "name": intent.tool_name,
                        "args": intent.arguments,
                    }
                }),
            ),
            Message::ToolResult(result) => push_part(
                &mut contents,
                "user",
                json!({
                    "functionResponse": {
                        "id": result.call_id,
                        "name": result.tool_name,
                        "response": result.to_engine_payload(),
                    }
                }),
            ),
        }
    }
    contents
}

/// Assemble a complete `generateContent` request body.
pub fn build_request(
    history: &[Message],
    tools: &[ToolDescriptor],
    system_instruction: &str,
) -> Value {
    let mut body = json!({ "contents": history_to_contents(history) });
    if !system_instruction.is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system_instruction }] });
    }
    if !tools.is_empty() {
        body["tools"] = json!([{ "functionDeclarations": function_declarations(tools) }]);
    }
    body
}

// ─── Gemini → Domain ─────────────────────────────────────────────

/// Extract an API error message from an error response body.
pub fn error_message(body: &Value) -> Option<&str> {
    body.get("error")?.get("message")?.as_str()
}

/// Turn a `generateContent` response into fragments.
///
/// Text parts become text fragments in order; all function calls of the
/// response are grouped into one trailing tool-call fragment. Calls without
/// an `id` get one from `next_id`.
pub fn parse_response(
    body: &Value,
    mut next_id: impl FnMut() -> String,
) -> Result<Vec<Fragment>, EngineError> {
    let Some(candidate) = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    else {
        let reason = body
            .pointer("/promptFeedback/blockReason")
            .and_then(|r| r.as_str())
            .unwrap_or("no candidates");
        return Err(EngineError::InvalidResponse(format!(
            "Gemini returned no answer ({})",
            reason
        )));
    };

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut fragments = Vec::new();
    let mut intents = Vec::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            if !text.is_empty() {
                fragments.push(Fragment::text(text));
            }
        } else if let Some(call) = part.get("functionCall") {
            let name = call.get("name").and_then(|n| n.as_str()).ok_or_else(|| {
                EngineError::InvalidResponse("functionCall without a name".to_string())
            })?;
            let call_id = call
                .get("id")
                .and_then(|id| id.as_str())
                .map(str::to_string)
                .unwrap_or_else(&mut next_id);
            let mut intent = ToolCallIntent::new(call_id, name);
            if let Some(Value::Object(args)) = call.get("args") {
                intent.arguments = args.clone();
            }
            intents.push(intent);
        }
    }

    if !intents.is_empty() {
        fragments.push(Fragment::ToolCalls(intents));
    }
    Ok(fragments)
}
