//! Error types for the conversation orchestrator.
//!
//! Tool failures never show up here: they are fed back to the model as tool
//! messages. The caller of a conversation only sees backend failures,
//! malformed backend output, configuration problems and cancellation.

use thiserror::Error;

/// Errors that can end a conversation.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The chat backend could not be reached or returned an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The conversation was cancelled by the caller.
    #[error("Conversation cancelled")]
    Cancelled,

    /// The backend answered with something that is not a chat response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid orchestrator configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::Backend(_))
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            AgentError::Backend(_) => "BACKEND_ERROR",
            AgentError::Cancelled => "CANCELLED",
            AgentError::InvalidResponse(_) => "INVALID_RESPONSE",
            AgentError::Serialization(_) => "SERIALIZATION_ERROR",
            AgentError::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// Result type for orchestrator operations.
pub type AgentResult<T> = Result<T, AgentError>;

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Serialization(err.to_string())
    }
}

#[cfg(feature = "ollama")]
impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AgentError::InvalidResponse(err.to_string())
        } else {
            AgentError::Backend(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::Backend("connection refused".to_string());
        assert_eq!(err.to_string(), "Backend error: connection refused");
        assert_eq!(AgentError::Cancelled.to_string(), "Conversation cancelled");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AgentError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(AgentError::Config("x".into()).error_code(), "CONFIG_ERROR");
        assert!(AgentError::Backend("x".into()).is_retryable());
        assert!(!AgentError::Cancelled.is_retryable());
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: AgentError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
