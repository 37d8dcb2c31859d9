//! Results of tool invocation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A required argument was not supplied.
    MissingArgument,
    /// A supplied argument did not match its declared type.
    InvalidArgument,
    /// The wrapped function reported an error.
    Execution,
    /// No tool with the requested name is registered.
    UnknownTool,
    /// The remote tool server reported an error.
    Remote,
    /// The channel to the remote tool server failed.
    Transport,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingArgument => "missing_argument",
            FailureKind::InvalidArgument => "invalid_argument",
            FailureKind::Execution => "execution",
            FailureKind::UnknownTool => "unknown_tool",
            FailureKind::Remote => "remote",
            FailureKind::Transport => "transport",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured description of a failed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ToolFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The outcome of invoking a tool.
///
/// Success payloads are opaque to the orchestrator; they are only rendered
/// to text when appended to the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum InvocationResult {
    Success(Value),
    Failure(ToolFailure),
}

impl InvocationResult {
    pub fn success(value: impl Into<Value>) -> Self {
        InvocationResult::Success(value.into())
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        InvocationResult::Failure(ToolFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, InvocationResult::Failure(_))
    }

    pub fn success_value(&self) -> Option<&Value> {
        match self {
            InvocationResult::Success(value) => Some(value),
            InvocationResult::Failure(_) => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            InvocationResult::Success(_) => None,
            InvocationResult::Failure(failure) => Some(failure.kind),
        }
    }

    /// Text appended to the conversation for this result.
    ///
    /// Success payloads are stringified with [`render_payload`]; failure
    /// messages are passed through verbatim.
    pub fn render(&self) -> String {
        match self {
            InvocationResult::Success(value) => render_payload(value),
            InvocationResult::Failure(failure) => failure.message.clone(),
        }
    }

    /// Convert into a plain `Result`.
    pub fn into_result(self) -> Result<Value, ToolFailure> {
        match self {
            InvocationResult::Success(value) => Ok(value),
            InvocationResult::Failure(failure) => Err(failure),
        }
    }
}

impl From<Result<Value, ToolFailure>> for InvocationResult {
    fn from(result: Result<Value, ToolFailure>) -> Self {
        match result {
            Ok(value) => InvocationResult::Success(value),
            Err(failure) => InvocationResult::Failure(failure),
        }
    }
}

// Largest integer an f64 represents exactly.
const MAX_EXACT_F64: f64 = 9_007_199_254_740_992.0;

/// Stringify a success payload for the conversation history.
///
/// Strings are emitted raw, floats without a fractional part are emitted as
/// integers (`5.0` becomes `5`), `null` becomes an empty string and every
/// other value is rendered as compact JSON.
pub fn render_payload(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(f) if number.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_F64 => {
                format!("{}", f as i64)
            }
            _ => number.to_string(),
        },
        other => other.to_string(),
    }
}
