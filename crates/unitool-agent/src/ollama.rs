//! [`ChatBackend`] over the Ollama `/api/chat` HTTP API.
//!
//! Non-streaming turns are a single JSON response. Streaming turns arrive as
//! JSON lines, one chunk per line, the last one carrying `"done": true`.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use unitool_core::{InvocationArguments, ToolDescriptor};

use crate::backend::{BackendEvent, BackendResponse, BackendStream, ChatBackend};
use crate::error::{AgentError, AgentResult};
use crate::message::{Message, MessageContent, ToolCallRequest};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5:32b";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    stream: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let role = message.role.to_string();
        match &message.content {
            MessageContent::Text { text } => WireMessage {
                role,
                content: text.clone(),
                ..Default::default()
            },
            MessageContent::ToolCalls { text, calls } => WireMessage {
                role,
                content: text.clone(),
                tool_calls: calls
                    .iter()
                    .map(|call| WireToolCall {
                        function: WireFunction {
                            name: call.name.clone(),
                            arguments: Value::Object(call.arguments.clone()),
                        },
                    })
                    .collect(),
                tool_name: None,
            },
            MessageContent::ToolResult {
                tool_name, content, ..
            } => WireMessage {
                role,
                content: content.clone(),
                tool_calls: Vec::new(),
                tool_name: Some(tool_name.clone()),
            },
        }
    }
}

fn to_request_calls(calls: Vec<WireToolCall>) -> AgentResult<Vec<ToolCallRequest>> {
    calls
        .into_iter()
        .map(|call| {
            let arguments = match call.function.arguments {
                Value::Object(map) => map,
                Value::Null => InvocationArguments::new(),
                // Some models send the arguments as an encoded JSON string.
                Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
                    AgentError::InvalidResponse(format!(
                        "arguments of '{}' are not a JSON object: {e}",
                        call.function.name
                    ))
                })?,
                other => {
                    return Err(AgentError::InvalidResponse(format!(
                        "arguments of '{}' are not a JSON object: {other}",
                        call.function.name
                    )));
                }
            };
            Ok(ToolCallRequest::new(call.function.name, arguments))
        })
        .collect()
}

/// Chat backend talking to an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, DEFAULT_MODEL)
    }
}

impl OllamaBackend {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, model)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.endpoint)
    }

    fn request<'a>(&'a self, history: &[Message], tools: &'a [ToolDescriptor], stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: history.iter().map(WireMessage::from).collect(),
            tools: tools
                .iter()
                .map(|tool| WireTool {
                    kind: "function",
                    function: WireToolFunction {
                        name: &tool.name,
                        description: &tool.description,
                        parameters: tool.input_schema(),
                    },
                })
                .collect(),
            stream,
        }
    }

    async fn post(&self, body: &ChatRequest<'_>) -> AgentResult<reqwest::Response> {
        debug!(model = %self.model, messages = body.messages.len(), stream = body.stream, "POST /api/chat");
        let response = self.client.post(self.chat_url()).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Backend(format!("Ollama returned {status}: {detail}")));
        }
        Ok(response)
    }
}

fn parse_chunk(line: &str) -> AgentResult<ChatChunk> {
    let chunk: ChatChunk = serde_json::from_str(line)
        .map_err(|e| AgentError::InvalidResponse(format!("malformed chat chunk: {e}")))?;
    if let Some(error) = &chunk.error {
        return Err(AgentError::Backend(error.clone()));
    }
    Ok(chunk)
}

/// Translate one streamed chunk into backend events.
fn chunk_events(chunk: ChatChunk) -> AgentResult<Vec<BackendEvent>> {
    let mut events = Vec::new();
    if let Some(message) = chunk.message {
        if !message.content.is_empty() {
            events.push(BackendEvent::TextDelta(message.content));
        }
        if !message.tool_calls.is_empty() {
            events.push(BackendEvent::ToolCalls(to_request_calls(message.tool_calls)?));
        }
    }
    if chunk.done {
        events.push(BackendEvent::Completed);
    }
    Ok(events)
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn send(&self, history: &[Message], tools: &[ToolDescriptor]) -> AgentResult<BackendResponse> {
        let body = self.request(history, tools, false);
        let raw = self.post(&body).await?.text().await?;
        let chunk = parse_chunk(&raw)?;

        let message = chunk
            .message
            .ok_or_else(|| AgentError::InvalidResponse("response has no message".to_string()))?;
        Ok(BackendResponse {
            text: message.content,
            tool_calls: to_request_calls(message.tool_calls)?,
        })
    }

    async fn send_streaming(&self, history: &[Message], tools: &[ToolDescriptor]) -> AgentResult<BackendStream> {
        let body = self.request(history, tools, true);
        let mut bytes = Box::pin(self.post(&body).await?.bytes_stream());

        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut completed = false;

            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => buffer.extend_from_slice(&chunk),
                    Err(err) => {
                        yield Err(AgentError::from(err));
                        return;
                    }
                }

                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_chunk(line.trim()).and_then(chunk_events) {
                        Ok(events) => {
                            for event in events {
                                completed |= event == BackendEvent::Completed;
                                yield Ok(event);
                            }
                        }
                        Err(err) => {
                            yield Err(err);
                            return;
                        }
                    }
                }
            }

            let tail = String::from_utf8_lossy(&buffer).trim().to_string();
            if !tail.is_empty() {
                match parse_chunk(&tail).and_then(chunk_events) {
                    Ok(events) => {
                        for event in events {
                            completed |= event == BackendEvent::Completed;
                            yield Ok(event);
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }

            if !completed {
                yield Ok(BackendEvent::Completed);
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use unitool_core::{ParameterKind, ParameterSchema, ParameterSpec};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn add_descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "Add",
            "Add two numbers together",
            ParameterSchema::Declared {
                parameters: vec![
                    ParameterSpec::required("a", ParameterKind::Number),
                    ParameterSpec::required("b", ParameterKind::Number),
                ],
            },
        )
    }

    #[tokio::test]
    async fn send_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "qwen2.5:32b",
                "stream": false,
                "tools": [{"type": "function", "function": {"name": "Add"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "qwen2.5:32b",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{"function": {"name": "Add", "arguments": {"a": 2, "b": 3}}}]
                },
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OllamaBackend::new(server.uri(), DEFAULT_MODEL);
        let response = backend
            .send(&[Message::user("What is 2 + 3?")], &[add_descriptor()])
            .await
            .unwrap();

        assert!(response.text.is_empty());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "Add");
        assert_eq!(response.tool_calls[0].arguments["a"], 2);
    }

    #[tokio::test]
    async fn send_streaming_forwards_deltas() {
        let server = MockServer::start().await;
        let body = [
            json!({"message": {"role": "assistant", "content": "The answer"}, "done": false}),
            json!({"message": {"role": "assistant", "content": " is 5"}, "done": false}),
            json!({"message": {"role": "assistant", "content": ""}, "done": true}),
        ]
        .iter()
        .map(|chunk| format!("{chunk}\n"))
        .collect::<String>();
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let backend = OllamaBackend::new(format!("{}/", server.uri()), DEFAULT_MODEL);
        let events: Vec<_> = backend
            .send_streaming(&[Message::user("What is 2 + 3?")], &[])
            .await
            .unwrap()
            .map(|event| event.unwrap())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                BackendEvent::TextDelta("The answer".into()),
                BackendEvent::TextDelta(" is 5".into()),
                BackendEvent::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn http_error_is_a_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let backend = OllamaBackend::new(server.uri(), "missing");
        let err = backend.send(&[Message::user("hi")], &[]).await.unwrap_err();

        assert!(matches!(err, AgentError::Backend(ref msg) if msg.contains("model not found")));
    }

    #[test]
    fn tool_results_carry_the_tool_name() {
        let call = ToolCallRequest::new("Add", InvocationArguments::new());
        let message = Message::tool_result(&call, &unitool_core::InvocationResult::success("5"));
        let wire = WireMessage::from(&message);

        assert_eq!(wire.role, "tool");
        assert_eq!(wire.content, "5");
        assert_eq!(wire.tool_name.as_deref(), Some("Add"));
    }

    #[test]
    fn string_encoded_arguments_are_decoded() {
        let calls = to_request_calls(vec![WireToolCall {
            function: WireFunction {
                name: "Add".into(),
                arguments: json!("{\"a\": 1, \"b\": 2}"),
            },
        }])
        .unwrap();
        assert_eq!(calls[0].arguments["b"], 2);
    }
}
