//! The conversation loop between a chat backend and the tool registry.
//!
//! One query runs as a small state machine: ask the model, and while it
//! requests tools, execute them and feed the results back. The loop ends
//! when the model answers with plain text or when the round-trip cap is
//! reached.

use futures::future::join_all;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use unitool_core::{InvocationResult, ToolDescriptor};
use unitool_tools::ToolRegistry;

use crate::backend::{BackendEvent, ChatBackend};
use crate::config::OrchestratorConfig;
use crate::error::{AgentError, AgentResult};
use crate::message::{Message, ToolCallRequest};

/// Answer text increments of a streaming conversation.
pub type ChatStream = Pin<Box<dyn Stream<Item = AgentResult<String>> + Send>>;

/// Why a conversation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model answered without requesting tools.
    Answered,
    /// The round-trip cap was reached while the model still requested tools.
    IterationLimit,
}

/// Full result of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOutcome {
    /// Text of the last backend response.
    pub answer: String,
    /// Conversation history, including the initial system and user messages.
    pub messages: Vec<Message>,
    /// Number of backend calls made.
    pub round_trips: u32,
    pub finish: FinishReason,
}

/// Drives conversations between a [`ChatBackend`] and a [`ToolRegistry`].
///
/// Cloning is cheap; clones share the backend, registry and configuration.
/// Every query owns its own history, so one orchestrator can serve several
/// conversations at the same time.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    backend: Arc<dyn ChatBackend>,
    registry: Arc<ToolRegistry>,
    config: Arc<OrchestratorConfig>,
}

impl std::fmt::Debug for ConversationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationOrchestrator")
            .field("backend", &self.backend.name())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

/// Await `fut` unless `cancel` fires first.
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> AgentResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AgentError::Cancelled),
        output = fut => Ok(output),
    }
}

impl ConversationOrchestrator {
    /// # Errors
    ///
    /// `AgentError::Config` if `config` does not validate.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        registry: Arc<ToolRegistry>,
        config: OrchestratorConfig,
    ) -> AgentResult<Self> {
        config
            .validate()
            .map_err(|e| AgentError::Config(e.to_string()))?;
        Ok(Self {
            backend,
            registry,
            config: Arc::new(config),
        })
    }

    pub fn with_defaults(backend: Arc<dyn ChatBackend>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            backend,
            registry,
            config: Arc::new(OrchestratorConfig::default()),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Descriptors advertised to the backend, in registration order.
    pub fn tool_descriptors(&self) -> Vec<ToolDescriptor> {
        self.registry.list()
    }

    fn initial_history(&self, prompt: &str) -> Vec<Message> {
        let mut history = Vec::with_capacity(2);
        if let Some(system) = &self.config.system_prompt {
            history.push(Message::system(system.clone()));
        }
        history.push(Message::user(prompt));
        history
    }

    /// Answer `prompt`, calling tools as the model requests them.
    ///
    /// Returns the final answer text.
    pub async fn chat(&self, prompt: &str) -> AgentResult<String> {
        let outcome = self.run(prompt, &CancellationToken::new()).await?;
        Ok(outcome.answer)
    }

    /// Like [`chat`](Self::chat), returning the whole conversation.
    ///
    /// # Errors
    ///
    /// Backend failures and malformed responses abort the query, as does
    /// cancelling `cancel`. Tool failures do not: they are reported to the
    /// model as tool messages.
    pub async fn run(&self, prompt: &str, cancel: &CancellationToken) -> AgentResult<ChatOutcome> {
        let tools = self.registry.list();
        let mut history = self.initial_history(prompt);
        let mut round_trips = 0;

        loop {
            round_trips += 1;
            debug!(round_trips, backend = %self.backend.name(), "Sending conversation to backend");
            let response = cancellable(cancel, self.backend.send(&history, &tools)).await??;

            if !response.wants_tools() {
                history.push(Message::assistant(response.text.clone()));
                info!(round_trips, "Conversation answered");
                return Ok(ChatOutcome {
                    answer: response.text,
                    messages: history,
                    round_trips,
                    finish: FinishReason::Answered,
                });
            }

            if round_trips >= self.config.max_iterations {
                warn!(
                    round_trips,
                    pending_calls = response.tool_calls.len(),
                    "Iteration limit reached, ignoring remaining tool calls"
                );
                return Ok(ChatOutcome {
                    answer: response.text,
                    messages: history,
                    round_trips,
                    finish: FinishReason::IterationLimit,
                });
            }

            let results = self.dispatch_calls(&response.tool_calls, cancel).await?;
            history.push(Message::tool_calls(response.text, response.tool_calls));
            history.extend(results);
        }
    }

    /// Streaming variant of [`chat`](Self::chat).
    ///
    /// Text increments are yielded as soon as the backend produces them.
    /// Tool calls are executed once the turn that requested them has ended.
    /// The stream ends after the answer, or with a single error item.
    pub fn chat_stream(&self, prompt: impl Into<String>, cancel: CancellationToken) -> ChatStream {
        let this = self.clone();
        let prompt = prompt.into();

        let stream = async_stream::stream! {
            let tools = this.registry.list();
            let mut history = this.initial_history(&prompt);
            let mut round_trips = 0;

            loop {
                round_trips += 1;
                debug!(round_trips, backend = %this.backend.name(), "Streaming conversation to backend");
                let mut events = match cancellable(&cancel, this.backend.send_streaming(&history, &tools)).await {
                    Ok(Ok(events)) => events,
                    Ok(Err(err)) | Err(err) => {
                        yield Err(err);
                        return;
                    }
                };

                let mut text = String::new();
                let mut calls: Vec<ToolCallRequest> = Vec::new();
                loop {
                    let event = match cancellable(&cancel, events.next()).await {
                        Ok(event) => event,
                        Err(err) => {
                            yield Err(err);
                            return;
                        }
                    };
                    match event {
                        None | Some(Ok(BackendEvent::Completed)) => break,
                        Some(Ok(BackendEvent::TextDelta(delta))) => {
                            if !delta.is_empty() {
                                text.push_str(&delta);
                                yield Ok(delta);
                            }
                        }
                        Some(Ok(BackendEvent::ToolCalls(requested))) => calls.extend(requested),
                        Some(Err(err)) => {
                            yield Err(err);
                            return;
                        }
                    }
                }

                if calls.is_empty() {
                    info!(round_trips, "Streamed conversation answered");
                    return;
                }

                if round_trips >= this.config.max_iterations {
                    warn!(
                        round_trips,
                        pending_calls = calls.len(),
                        "Iteration limit reached, ignoring remaining tool calls"
                    );
                    return;
                }

                match this.dispatch_calls(&calls, &cancel).await {
                    Ok(results) => {
                        history.push(Message::tool_calls(text, calls));
                        history.extend(results);
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        };

        Box::pin(stream)
    }

    /// Execute one turn's tool calls and build the matching tool messages,
    /// in request order.
    async fn dispatch_calls(
        &self,
        calls: &[ToolCallRequest],
        cancel: &CancellationToken,
    ) -> AgentResult<Vec<Message>> {
        if self.config.allow_concurrent_invocation && calls.len() > 1 {
            let pending = calls.iter().map(|call| self.invoke(call));
            let results = cancellable(cancel, join_all(pending)).await?;
            return Ok(calls
                .iter()
                .zip(results.iter())
                .map(|(call, result)| Message::tool_result(call, result))
                .collect());
        }

        let mut messages = Vec::with_capacity(calls.len());
        for call in calls {
            let result = cancellable(cancel, self.invoke(call)).await?;
            messages.push(Message::tool_result(call, &result));
        }
        Ok(messages)
    }

    async fn invoke(&self, call: &ToolCallRequest) -> InvocationResult {
        debug!(tool = %call.name, call_id = %call.id, "Dispatching tool call");
        let result = self.registry.invoke(&call.name, call.arguments.clone()).await;
        if let InvocationResult::Failure(failure) = &result {
            warn!(
                tool = %call.name,
                kind = %failure.kind,
                error = %failure.message,
                "Tool call failed"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use unitool_core::{InvocationArguments, ParameterKind};
    use unitool_tools::InProcessTool;

    /// Replays canned responses, then answers "done".
    struct Replay {
        responses: Mutex<VecDeque<BackendResponse>>,
        calls: AtomicU32,
    }

    impl Replay {
        fn new(responses: Vec<BackendResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Replay {
        async fn send(&self, _: &[Message], _: &[ToolDescriptor]) -> AgentResult<BackendResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| BackendResponse::text("done")))
        }
    }

    /// Requests the same tool forever.
    struct AlwaysCalls(AtomicU32);

    #[async_trait]
    impl ChatBackend for AlwaysCalls {
        async fn send(&self, _: &[Message], _: &[ToolDescriptor]) -> AgentResult<BackendResponse> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(BackendResponse {
                text: format!("turn {n}"),
                tool_calls: vec![add_call(1, 1)],
            })
        }
    }

    fn add_call(a: i64, b: i64) -> ToolCallRequest {
        let args: InvocationArguments = json!({"a": a, "b": b}).as_object().cloned().unwrap();
        ToolCallRequest::new("Add", args)
    }

    fn registry() -> Arc<ToolRegistry> {
        let add = InProcessTool::builder("Add")
            .description("Add two numbers together")
            .required("a", ParameterKind::Number, "The first number")
            .required("b", ParameterKind::Number, "The second number")
            .sync_handler(|args| Ok::<_, unitool_core::ToolError>(args.get::<f64>("a")? + args.get::<f64>("b")?))
            .build()
            .unwrap();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(add)).unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn text_only_response_ends_after_one_round_trip() {
        let backend = Replay::new(vec![BackendResponse::text("Hello!")]);
        let orchestrator = ConversationOrchestrator::with_defaults(backend.clone(), registry());

        let outcome = orchestrator.run("Hi", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.answer, "Hello!");
        assert_eq!(outcome.round_trips, 1);
        assert_eq!(outcome.finish, FinishReason::Answered);
        assert_eq!(outcome.messages.len(), 2);
    }

    #[tokio::test]
    async fn tool_result_is_fed_back_before_the_answer() {
        let backend = Replay::new(vec![
            BackendResponse::tool_calls(vec![add_call(2, 3)]),
            BackendResponse::text("5"),
        ]);
        let orchestrator = ConversationOrchestrator::with_defaults(backend, registry());

        let outcome = orchestrator.run("What is 2 + 3?", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.answer, "5");
        assert_eq!(outcome.round_trips, 2);
        let roles: Vec<_> = outcome.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                crate::message::Role::User,
                crate::message::Role::Assistant,
                crate::message::Role::Tool,
                crate::message::Role::Assistant,
            ]
        );
        assert_eq!(outcome.messages[2].text_content(), "5");
    }

    #[tokio::test]
    async fn system_prompt_comes_first() {
        let backend = Replay::new(vec![BackendResponse::text("ok")]);
        let config = OrchestratorConfig::builder()
            .system_prompt("You are a calculator.")
            .build()
            .unwrap();
        let orchestrator = ConversationOrchestrator::new(backend, registry(), config).unwrap();

        let outcome = orchestrator.run("Hi", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.messages[0].role, crate::message::Role::System);
        assert_eq!(outcome.messages[1].role, crate::message::Role::User);
    }

    #[tokio::test]
    async fn cap_limits_round_trips_and_skips_pending_calls() {
        let backend = Arc::new(AlwaysCalls(AtomicU32::new(0)));
        let config = OrchestratorConfig::builder().max_iterations(3).build().unwrap();
        let orchestrator = ConversationOrchestrator::new(backend.clone(), registry(), config).unwrap();

        let outcome = orchestrator.run("loop", &CancellationToken::new()).await.unwrap();

        assert_eq!(backend.0.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.round_trips, 3);
        assert_eq!(outcome.finish, FinishReason::IterationLimit);
        assert_eq!(outcome.answer, "turn 2");
        let tool_messages = outcome
            .messages
            .iter()
            .filter(|m| m.role == crate::message::Role::Tool)
            .count();
        assert_eq!(tool_messages, 2);
    }

    #[tokio::test]
    async fn zero_iterations_is_rejected() {
        let backend = Replay::new(vec![]);
        let config = OrchestratorConfig {
            max_iterations: 0,
            ..Default::default()
        };
        let err = ConversationOrchestrator::new(backend, registry(), config).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_the_backend() {
        let backend = Replay::new(vec![BackendResponse::text("never")]);
        let orchestrator = ConversationOrchestrator::with_defaults(backend.clone(), registry());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orchestrator.run("Hi", &cancel).await.unwrap_err();

        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stream_yields_answer_text() {
        let backend = Replay::new(vec![
            BackendResponse::tool_calls(vec![add_call(2, 3)]),
            BackendResponse::text("The sum is 5"),
        ]);
        let orchestrator = ConversationOrchestrator::with_defaults(backend, registry());

        let chunks: Vec<String> = orchestrator
            .chat_stream("What is 2 + 3?", CancellationToken::new())
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert_eq!(chunks.concat(), "The sum is 5");
    }

    #[test]
    fn descriptors_follow_the_registry() {
        let orchestrator =
            ConversationOrchestrator::with_defaults(Replay::new(vec![]), registry());
        let names: Vec<_> = orchestrator
            .tool_descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Add"]);
    }
}
