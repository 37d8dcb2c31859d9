//! Conversation history types.

use serde::{Deserialize, Serialize};
use unitool_core::{InvocationArguments, InvocationResult};
use uuid::Uuid;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Result of a tool call, fed back to the model.
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier correlating the call with its result message.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: InvocationArguments,
}

impl ToolCallRequest {
    /// Create a request with a fresh identifier.
    pub fn new(name: impl Into<String>, arguments: InvocationArguments) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Body of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    /// Assistant turn that asks for tool calls, with any text emitted alongside.
    ToolCalls {
        #[serde(default)]
        text: String,
        calls: Vec<ToolCallRequest>,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text { text: text.into() },
        }
    }

    pub fn tool_calls(text: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::ToolCalls {
                text: text.into(),
                calls,
            },
        }
    }

    /// Tool message carrying the rendered outcome of `call`.
    pub fn tool_result(call: &ToolCallRequest, result: &InvocationResult) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::ToolResult {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                content: result.render(),
                is_error: result.is_failure(),
            },
        }
    }

    /// Text carried by the message, empty for pure tool-call turns.
    pub fn text_content(&self) -> &str {
        match &self.content {
            MessageContent::Text { text } | MessageContent::ToolCalls { text, .. } => text,
            MessageContent::ToolResult { content, .. } => content,
        }
    }

    /// Tool calls requested by this message, if any.
    pub fn requested_calls(&self) -> &[ToolCallRequest] {
        match &self.content {
            MessageContent::ToolCalls { calls, .. } => calls,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use unitool_core::FailureKind;

    fn args(value: serde_json::Value) -> InvocationArguments {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn tool_result_renders_the_payload() {
        let call = ToolCallRequest::new("Add", args(json!({"a": 2, "b": 3}))).with_id("c1");
        let message = Message::tool_result(&call, &InvocationResult::success(5.0));

        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.text_content(), "5");
        assert!(matches!(
            message.content,
            MessageContent::ToolResult { ref call_id, is_error: false, .. } if call_id == "c1"
        ));
    }

    #[test]
    fn failed_tool_result_is_flagged() {
        let call = ToolCallRequest::new("Foo", InvocationArguments::new());
        let result = InvocationResult::failure(FailureKind::UnknownTool, "Unknown tool 'Foo'");
        let message = Message::tool_result(&call, &result);

        assert!(matches!(message.content, MessageContent::ToolResult { is_error: true, .. }));
        assert_eq!(message.text_content(), "Unknown tool 'Foo'");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = ToolCallRequest::new("Add", InvocationArguments::new());
        let b = ToolCallRequest::new("Add", InvocationArguments::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn requested_calls_only_on_tool_call_turns() {
        let call = ToolCallRequest::new("Add", InvocationArguments::new());
        assert_eq!(Message::tool_calls("", vec![call]).requested_calls().len(), 1);
        assert!(Message::assistant("hi").requested_calls().is_empty());
    }

    #[test]
    fn serializes_with_lowercase_role() {
        let value = serde_json::to_value(Message::user("hello")).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"]["type"], "text");
    }
}
