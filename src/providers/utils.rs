use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};
use uuid::Uuid;

use super::base::ProviderError;
use super::types::{
    message::{ImageContent, Message},
    tool::{ToolCall, ToolSpec},
};

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut converted = json!({
                "role": message.role,
                "content": message.content,
            });

            if !message.images.is_empty() {
                let mut parts = vec![json!({"type": "text", "text": message.text()})];
                parts.extend(message.images.iter().map(convert_image));
                converted["content"] = json!(parts);
            }

            if message.has_tool_calls() {
                converted["tool_calls"] = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": sanitize_function_name(&call.name),
                                "arguments": call.arguments,
                            }
                        })
                    })
                    .collect();
            }
            if let Some(id) = &message.tool_call_id {
                converted["tool_call_id"] = json!(id);
            }
            if let Some(name) = &message.name {
                converted["name"] = json!(name);
            }
            converted
        })
        .collect()
}

/// Convert an image into an OpenAI `image_url` content part
pub fn convert_image(image: &ImageContent) -> Value {
    json!({
        "type": "image_url",
        "image_url": {
            "url": format!("data:{};base64,{}", image.mime_type, image.data)
        }
    })
}

/// Convert tool specs to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[ToolSpec]) -> Result<Vec<Value>, ProviderError> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(ProviderError::InvalidRequest(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters_schema(),
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: &Value) -> Result<Message, ProviderError> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| {
            ProviderError::MalformedResponse("response has no choices[0].message".to_string())
        })?;

    let content = original
        .get("content")
        .and_then(|text| text.as_str())
        .map(str::to_string);

    let mut tool_calls = Vec::new();
    if let Some(calls) = original.get("tool_calls").and_then(|v| v.as_array()) {
        for call in calls {
            let id = call["id"]
                .as_str()
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .unwrap_or_else(fallback_call_id);
            let name = call["function"]["name"].as_str().ok_or_else(|| {
                ProviderError::MalformedResponse(format!("tool call {} has no function name", id))
            })?;
            // Some compatible backends send arguments as an object instead of a string
            let arguments = match &call["function"]["arguments"] {
                Value::String(raw) => raw.clone(),
                Value::Null => "{}".to_string(),
                other => other.to_string(),
            };
            tool_calls.push(ToolCall::new(id, name, arguments));
        }
    }

    Message::assistant_with_tool_calls(content, tool_calls)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
}

/// Id for a tool call the backend returned without one, so results can still be linked.
pub fn fallback_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

static INVALID_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("valid name pattern"));

fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

pub fn check_openai_context_length_error(error: &Value) -> Option<ProviderError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ProviderError::ContextLengthExceeded(message))
    } else {
        None
    }
}
