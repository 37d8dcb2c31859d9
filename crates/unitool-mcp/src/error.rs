//! MCP error types
//!
//! Errors raised while starting or talking to an MCP server, and their
//! mapping onto the transport-neutral [`SessionError`].

use thiserror::Error;
use unitool_tools::SessionError;

/// MCP operation result type
pub type McpResult<T> = Result<T, McpError>;

/// Errors that can occur during MCP operations
#[derive(Debug, Error)]
pub enum McpError {
    /// The server command is empty
    #[error("Empty server command")]
    EmptyCommand,

    /// The server process could not be started
    #[error("Failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },

    /// The MCP handshake failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server violated the protocol or returned an error response
    #[error("MCP protocol error: {0}")]
    Protocol(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl McpError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, McpError::Connection(_))
    }
}

impl From<McpError> for SessionError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::Protocol(message) => SessionError::Remote(message),
            McpError::Serialization(e) => SessionError::Remote(format!("Malformed MCP payload: {e}")),
            other => SessionError::Transport(other.to_string()),
        }
    }
}
