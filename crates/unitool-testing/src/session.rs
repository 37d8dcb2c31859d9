//! # Mock Tool Session
//!
//! An in-memory [`ToolSession`] standing in for an external tool server.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use unitool_core::InvocationArguments;
use unitool_tools::{RemoteToolInfo, SessionError, ToolSession};

/// A mock session with canned listings and responses.
#[derive(Debug, Clone)]
pub struct MockSession {
    name: String,
    tools: Vec<RemoteToolInfo>,
    responses: HashMap<String, Result<Value, SessionError>>,
    list_failure: Option<SessionError>,
    call_history: Arc<Mutex<Vec<(String, InvocationArguments)>>>,
}

impl MockSession {
    /// Create a new mock session with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
            responses: HashMap::new(),
            list_failure: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Expose a tool with the given input schema
    pub fn with_tool(mut self, name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        self.tools.push(RemoteToolInfo::new(name, description, input_schema));
        self
    }

    /// Content returned when `tool` is called
    pub fn with_response(mut self, tool: impl Into<String>, content: Value) -> Self {
        self.responses.insert(tool.into(), Ok(content));
        self
    }

    /// Error returned when `tool` is called
    pub fn with_error(mut self, tool: impl Into<String>, error: SessionError) -> Self {
        self.responses.insert(tool.into(), Err(error));
        self
    }

    /// Make the tool listing fail
    pub fn with_list_failure(mut self, error: SessionError) -> Self {
        self.list_failure = Some(error);
        self
    }

    /// Get the number of tool calls received
    pub fn call_count(&self) -> usize {
        self.call_history.lock().unwrap().len()
    }

    /// Get the history of tool calls received
    pub fn call_history(&self) -> Vec<(String, InvocationArguments)> {
        self.call_history.lock().unwrap().clone()
    }

    /// Check if a tool was called at least once
    pub fn was_called(&self, tool: &str) -> bool {
        self.call_history
            .lock()
            .unwrap()
            .iter()
            .any(|(name, _)| name == tool)
    }
}

#[async_trait]
impl ToolSession for MockSession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<RemoteToolInfo>, SessionError> {
        match &self.list_failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.tools.clone()),
        }
    }

    async fn call_tool(&self, name: &str, args: InvocationArguments) -> Result<Value, SessionError> {
        self.call_history
            .lock()
            .unwrap()
            .push((name.to_string(), args.clone()));

        match self.responses.get(name) {
            Some(response) => response.clone(),
            None => Ok(Value::String(format!(
                "Mock response for {name}: {}",
                Value::Object(args)
            ))),
        }
    }
}
