//! Tool invocation errors.
//!
//! Every per-call error is recoverable: the orchestrator converts it into a
//! failure [`InvocationResult`](crate::InvocationResult) so the model can
//! adapt its next step instead of aborting the conversation.

use thiserror::Error;

use crate::result::{FailureKind, ToolFailure};

/// Errors that can occur while invoking a tool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// A required argument was not supplied.
    #[error("Tool '{tool}' is missing required argument '{parameter}'")]
    MissingArgument { tool: String, parameter: String },

    /// A supplied argument has the wrong JSON type.
    #[error("Tool '{tool}' argument '{parameter}' must be of type {expected}")]
    InvalidArgument {
        tool: String,
        parameter: String,
        expected: String,
    },

    /// A supplied argument could not be read as the type the tool expects.
    #[error("Tool '{tool}' argument '{parameter}' could not be read: {message}")]
    MalformedArgument {
        tool: String,
        parameter: String,
        message: String,
    },

    /// The wrapped function failed.
    #[error("{message}")]
    Execution { tool: String, message: String },

    /// No tool with this name is registered.
    #[error("Unknown tool '{name}'")]
    UnknownTool { name: String },

    /// The remote server reported a tool error.
    #[error("{message}")]
    Remote { tool: String, message: String },

    /// The channel to the remote server failed.
    #[error("Transport error calling '{tool}': {message}")]
    Transport { tool: String, message: String },
}

impl ToolError {
    pub fn missing_argument(tool: impl Into<String>, parameter: impl Into<String>) -> Self {
        ToolError::MissingArgument {
            tool: tool.into(),
            parameter: parameter.into(),
        }
    }

    pub fn execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::Execution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        ToolError::UnknownTool { name: name.into() }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ToolError::MissingArgument { .. } => FailureKind::MissingArgument,
            ToolError::InvalidArgument { .. } | ToolError::MalformedArgument { .. } => {
                FailureKind::InvalidArgument
            }
            ToolError::Execution { .. } => FailureKind::Execution,
            ToolError::UnknownTool { .. } => FailureKind::UnknownTool,
            ToolError::Remote { .. } => FailureKind::Remote,
            ToolError::Transport { .. } => FailureKind::Transport,
        }
    }

    /// Name of the tool the error relates to.
    pub fn tool_name(&self) -> &str {
        match self {
            ToolError::MissingArgument { tool, .. }
            | ToolError::InvalidArgument { tool, .. }
            | ToolError::MalformedArgument { tool, .. }
            | ToolError::Execution { tool, .. }
            | ToolError::Remote { tool, .. }
            | ToolError::Transport { tool, .. } => tool,
            ToolError::UnknownTool { name } => name,
        }
    }

    /// Convert into the failure carried by an invocation result.
    pub fn to_failure(&self) -> ToolFailure {
        ToolFailure::new(self.kind(), self.to_string())
    }
}

impl From<ToolError> for ToolFailure {
    fn from(err: ToolError) -> Self {
        err.to_failure()
    }
}

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;
