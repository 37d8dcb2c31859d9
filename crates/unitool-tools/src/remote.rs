//! Adapter that exposes tools of an external tool-server session as
//! [`CallableTool`]s.
//!
//! The session itself (process spawning, handshake, wire format) lives
//! behind the [`ToolSession`] trait. A [`RemoteTool`] copies its descriptor
//! from the session's listing once, at registration time, and forwards every
//! invocation as a single "call tool by name" request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use unitool_core::{
    CallableTool, InvocationArguments, InvocationResult, ParameterSchema, ToolAnnotations,
    ToolDescriptor, ToolError, ToolOrigin,
};

/// One entry of a remote session's tool listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl RemoteToolInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            annotations: None,
        }
    }

    fn into_descriptor(self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name,
            description: self.description,
            parameters: ParameterSchema::Json {
                schema: self.input_schema,
            },
            annotations: self.annotations,
        }
    }
}

/// Errors reported by a remote tool session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The channel to the server failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server did not answer in time.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The server answered with a tool error.
    #[error("{0}")]
    Remote(String),

    /// The session has been shut down.
    #[error("Session closed")]
    Closed,
}

impl SessionError {
    /// Transient errors that may succeed on a later attempt.
    ///
    /// The remote adapter never retries on its own; callers may.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Transport(_) | SessionError::Timeout(_))
    }
}

/// An established session with an external tool server.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Human-readable session name used in logs.
    fn name(&self) -> &str {
        "remote"
    }

    /// List the tools the server currently exposes.
    async fn list_tools(&self) -> Result<Vec<RemoteToolInfo>, SessionError>;

    /// Call a tool by name and wait for its single response.
    async fn call_tool(&self, name: &str, args: InvocationArguments) -> Result<Value, SessionError>;
}

/// A tool proxied over a [`ToolSession`].
#[derive(Clone)]
pub struct RemoteTool {
    descriptor: ToolDescriptor,
    session: Arc<dyn ToolSession>,
}

impl std::fmt::Debug for RemoteTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTool")
            .field("descriptor", &self.descriptor)
            .field("session", &self.session.name())
            .finish()
    }
}

impl RemoteTool {
    pub fn new(info: RemoteToolInfo, session: Arc<dyn ToolSession>) -> Self {
        Self {
            descriptor: info.into_descriptor(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<dyn ToolSession> {
        &self.session
    }

    fn to_error(&self, err: SessionError) -> ToolError {
        let tool = self.descriptor.name.clone();
        match err {
            SessionError::Remote(message) => ToolError::Remote { tool, message },
            other => ToolError::Transport {
                tool,
                message: other.to_string(),
            },
        }
    }
}

#[async_trait]
impl CallableTool for RemoteTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn origin(&self) -> ToolOrigin {
        ToolOrigin::Remote
    }

    async fn invoke(&self, args: InvocationArguments) -> InvocationResult {
        debug!(
            tool = %self.descriptor.name,
            session = %self.session.name(),
            "Forwarding tool call to remote session"
        );

        match self.session.call_tool(&self.descriptor.name, args).await {
            Ok(Value::Null) => InvocationResult::Failure(
                ToolError::Remote {
                    tool: self.descriptor.name.clone(),
                    message: format!("Remote tool '{}' returned no content", self.descriptor.name),
                }
                .to_failure(),
            ),
            Ok(content) => InvocationResult::Success(content),
            Err(err) => {
                warn!(
                    tool = %self.descriptor.name,
                    session = %self.session.name(),
                    error = %err,
                    "Remote tool call failed"
                );
                InvocationResult::Failure(self.to_error(err).to_failure())
            }
        }
    }
}
