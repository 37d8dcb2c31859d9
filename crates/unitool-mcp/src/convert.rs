//! Conversions between MCP wire payloads and Unitool types.
//!
//! Both directions go through `serde_json::Value` so they only depend on the
//! MCP JSON shape (camelCase keys), not on the SDK's Rust types.

use serde_json::Value;
use unitool_core::ToolAnnotations;
use unitool_tools::{RemoteToolInfo, SessionError};

use crate::error::{McpError, McpResult};

/// Build a listing entry from a serialized MCP `Tool`.
pub fn tool_info_from_value(value: Value) -> McpResult<RemoteToolInfo> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| McpError::Protocol("tool listing entry has no name".to_string()))?;

    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let input_schema = match value.get("inputSchema") {
        Some(schema @ Value::Object(_)) => schema.clone(),
        _ => serde_json::json!({ "type": "object", "properties": {} }),
    };

    let mut info = RemoteToolInfo::new(name, description, input_schema);
    info.annotations = value.get("annotations").and_then(annotations_from_value);
    Ok(info)
}

fn annotations_from_value(value: &Value) -> Option<ToolAnnotations> {
    let flag = |key: &str| value.get(key).and_then(Value::as_bool);
    let annotations = ToolAnnotations {
        title: value.get("title").and_then(Value::as_str).map(str::to_string),
        read_only_hint: flag("readOnlyHint"),
        destructive_hint: flag("destructiveHint"),
        idempotent_hint: flag("idempotentHint"),
        open_world_hint: flag("openWorldHint"),
    };
    (annotations != ToolAnnotations::default()).then_some(annotations)
}

/// Interpret text content: JSON documents are parsed, anything else stays a string.
fn parse_text(text: &str) -> Value {
    let trimmed = text.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && let Ok(value) = serde_json::from_str(text)
    {
        return value;
    }
    Value::String(text.to_string())
}

/// Extract the payload of a serialized MCP `CallToolResult`.
///
/// Structured content wins when present. Otherwise text items are joined
/// with newlines, and a single JSON-looking text item is parsed. Results
/// flagged `isError` become [`SessionError::Remote`] carrying the text.
pub fn payload_from_result(value: Value) -> Result<Value, SessionError> {
    let is_error = value.get("isError").and_then(Value::as_bool).unwrap_or(false);
    let items = value
        .get("content")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let texts: Vec<&str> = items
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect();

    if is_error {
        let message = if texts.is_empty() {
            "MCP tool reported an error".to_string()
        } else {
            texts.join("\n")
        };
        return Err(SessionError::Remote(message));
    }

    if let Some(structured) = value.get("structuredContent").filter(|v| !v.is_null()) {
        return Ok(structured.clone());
    }

    Ok(match texts.as_slice() {
        [] if items.is_empty() => Value::Null,
        [] => Value::Array(items.clone()),
        [single] => parse_text(single),
        many => Value::String(many.join("\n")),
    })
}
