//! Boundary to the language-model chat service.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use unitool_core::ToolDescriptor;

use crate::error::AgentResult;
use crate::message::{Message, ToolCallRequest};

/// A complete (non-streaming) backend turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl BackendResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            text: String::new(),
            tool_calls: calls,
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Incremental output of a streaming backend turn.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    TextDelta(String),
    /// Tool calls requested in this turn. May arrive more than once; the
    /// calls accumulate.
    ToolCalls(Vec<ToolCallRequest>),
    /// The turn is over.
    Completed,
}

pub type BackendStream = Pin<Box<dyn Stream<Item = AgentResult<BackendEvent>> + Send>>;

/// A chat model that can request tool calls.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str {
        "backend"
    }

    /// Send the full history and the available tools, wait for the whole turn.
    async fn send(&self, history: &[Message], tools: &[ToolDescriptor]) -> AgentResult<BackendResponse>;

    /// Streaming variant of [`send`](Self::send).
    ///
    /// Backends without native streaming get the whole turn as a single
    /// delta followed by the tool calls.
    async fn send_streaming(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> AgentResult<BackendStream> {
        let response = self.send(history, tools).await?;

        let stream = async_stream::stream! {
            if !response.text.is_empty() {
                yield Ok(BackendEvent::TextDelta(response.text));
            }
            if !response.tool_calls.is_empty() {
                yield Ok(BackendEvent::ToolCalls(response.tool_calls));
            }
            yield Ok(BackendEvent::Completed);
        };

        Ok(Box::pin(stream))
    }
}
