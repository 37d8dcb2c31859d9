//! # Scripted Chat Backend
//!
//! A [`ChatBackend`] that replays a fixed script of turns, recording every
//! history it is sent so tests can assert on what the model would have seen.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use unitool_agent::{
    AgentError, AgentResult, BackendEvent, BackendResponse, BackendStream, ChatBackend, Message,
    ToolCallRequest,
};
use unitool_core::{InvocationArguments, ToolDescriptor};

/// One scripted backend turn.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// A complete response. Streamed as one delta per word.
    Reply(BackendResponse),
    /// Explicit text deltas followed by tool calls.
    Chunks {
        deltas: Vec<String>,
        tool_calls: Vec<ToolCallRequest>,
    },
    /// The backend fails with this message.
    Fail(String),
    /// The backend never answers.
    Hang,
}

impl ScriptedTurn {
    fn into_events(self) -> Vec<BackendEvent> {
        let (deltas, tool_calls) = match self {
            ScriptedTurn::Reply(response) => (
                response
                    .text
                    .split_inclusive(' ')
                    .map(str::to_string)
                    .collect(),
                response.tool_calls,
            ),
            ScriptedTurn::Chunks { deltas, tool_calls } => (deltas, tool_calls),
            ScriptedTurn::Fail(_) | ScriptedTurn::Hang => (Vec::new(), Vec::new()),
        };

        let mut events: Vec<BackendEvent> = deltas.into_iter().map(BackendEvent::TextDelta).collect();
        if !tool_calls.is_empty() {
            events.push(BackendEvent::ToolCalls(tool_calls));
        }
        events.push(BackendEvent::Completed);
        events
    }
}

/// Build a tool call request from a JSON object literal.
pub fn tool_call(name: &str, arguments: Value) -> ToolCallRequest {
    let arguments: InvocationArguments = match arguments {
        Value::Object(map) => map,
        _ => InvocationArguments::new(),
    };
    ToolCallRequest::new(name, arguments)
}

/// A chat backend that follows a script.
///
/// When the script runs out the backend repeats its fallback turn if one is
/// set, and fails otherwise.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<VecDeque<ScriptedTurn>>>,
    fallback: Option<ScriptedTurn>,
    histories: Arc<Mutex<Vec<Vec<Message>>>>,
    advertised: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedBackend {
    /// Create a backend with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turn(self, turn: ScriptedTurn) -> Self {
        self.script.lock().unwrap().push_back(turn);
        self
    }

    /// Answer with plain text
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_turn(ScriptedTurn::Reply(BackendResponse::text(text)))
    }

    /// Request a single tool call
    pub fn with_tool_call(self, name: &str, arguments: Value) -> Self {
        self.with_tool_calls(vec![tool_call(name, arguments)])
    }

    /// Request several tool calls in one turn
    pub fn with_tool_calls(self, calls: Vec<ToolCallRequest>) -> Self {
        self.with_turn(ScriptedTurn::Reply(BackendResponse::tool_calls(calls)))
    }

    /// Stream the given deltas as one turn
    pub fn with_chunks(self, deltas: &[&str]) -> Self {
        self.with_turn(ScriptedTurn::Chunks {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            tool_calls: Vec::new(),
        })
    }

    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.with_turn(ScriptedTurn::Fail(message.into()))
    }

    /// Block forever on the next turn
    pub fn with_hang(self) -> Self {
        self.with_turn(ScriptedTurn::Hang)
    }

    /// Turn replayed once the script is exhausted
    pub fn repeating(mut self, turn: ScriptedTurn) -> Self {
        self.fallback = Some(turn);
        self
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.histories.lock().unwrap().len()
    }

    /// Histories received, one per request
    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.histories.lock().unwrap().clone()
    }

    /// Tool names advertised with each request
    pub fn advertised_tools(&self) -> Vec<Vec<String>> {
        self.advertised.lock().unwrap().clone()
    }

    fn next_turn(&self, history: &[Message], tools: &[ToolDescriptor]) -> AgentResult<ScriptedTurn> {
        self.histories.lock().unwrap().push(history.to_vec());
        self.advertised
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| AgentError::Backend("script exhausted".to_string()))
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, history: &[Message], tools: &[ToolDescriptor]) -> AgentResult<BackendResponse> {
        match self.next_turn(history, tools)? {
            ScriptedTurn::Reply(response) => Ok(response),
            ScriptedTurn::Chunks { deltas, tool_calls } => Ok(BackendResponse {
                text: deltas.concat(),
                tool_calls,
            }),
            ScriptedTurn::Fail(message) => Err(AgentError::Backend(message)),
            ScriptedTurn::Hang => futures::future::pending().await,
        }
    }

    async fn send_streaming(&self, history: &[Message], tools: &[ToolDescriptor]) -> AgentResult<BackendStream> {
        let turn = self.next_turn(history, tools)?;
        match turn {
            ScriptedTurn::Fail(message) => Err(AgentError::Backend(message)),
            ScriptedTurn::Hang => Ok(Box::pin(futures::stream::pending())),
            turn => {
                let events = turn.into_events();
                let stream = async_stream::stream! {
                    for event in events {
                        tokio::task::yield_now().await;
                        yield Ok(event);
                    }
                };
                Ok(Box::pin(stream))
            }
        }
    }
}
