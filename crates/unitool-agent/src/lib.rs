//! # Unitool Agent - Conversation Orchestrator
//!
//! This crate runs the conversation loop between a chat model and the tools
//! of a [`ToolRegistry`](unitool_tools::ToolRegistry).
//!
//! ## Features
//!
//! - **Backend boundary**: any model implementing [`ChatBackend`]
//! - **Tool loop**: tool calls are executed in request order and their
//!   results fed back until the model answers
//! - **Streaming**: answer text is forwarded as soon as the backend emits it
//! - **Cancellation**: every query can be cancelled with a
//!   [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - **Ollama backend**: HTTP client for a local Ollama server (requires `ollama` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use unitool_agent::{ConversationOrchestrator, OllamaBackend, OrchestratorConfig};
//! use unitool_tools::ToolRegistry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = ToolRegistry::new();
//!     registry.register_in_process(&CalculatorService)?;
//!
//!     let orchestrator = ConversationOrchestrator::new(
//!         Arc::new(OllamaBackend::default()),
//!         Arc::new(registry),
//!         OrchestratorConfig::from_env()?,
//!     )?;
//!
//!     println!("{}", orchestrator.chat("What is 2 + 3?").await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod message;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod orchestrator;

pub use backend::{BackendEvent, BackendResponse, BackendStream, ChatBackend};
pub use config::{ConfigError, DEFAULT_MAX_ITERATIONS, OrchestratorConfig, OrchestratorConfigBuilder};
pub use error::{AgentError, AgentResult};
pub use message::{Message, MessageContent, Role, ToolCallRequest};
#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;
pub use orchestrator::{ChatOutcome, ChatStream, ConversationOrchestrator, FinishReason};
pub use tokio_util::sync::CancellationToken;
