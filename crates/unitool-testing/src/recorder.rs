//! # Call Recorder
//!
//! In-process tools that log when they start and finish, for asserting on
//! invocation order and cancellation.

use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use unitool_core::ToolError;
use unitool_tools::{BoundArguments, InProcessTool};

/// A start or end of a recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Started(String),
    Finished(String),
}

/// Shared log of tool invocation events.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    events: Arc<Mutex<Vec<CallEvent>>>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events in order
    pub fn events(&self) -> Vec<CallEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Names of tools that finished, in completion order
    pub fn finished(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                CallEvent::Finished(name) => Some(name.clone()),
                CallEvent::Started(_) => None,
            })
            .collect()
    }

    fn record(&self, event: CallEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// A zero-parameter tool that sleeps for `delay`, then returns `output`.
    pub fn tool(&self, name: &str, delay: Duration, output: Value) -> InProcessTool {
        let recorder = self.clone();
        let tool_name = name.to_string();
        InProcessTool::builder(name)
            .description(format!("Recorded tool {name}"))
            .handler(move |_args: BoundArguments| {
                let recorder = recorder.clone();
                let tool_name = tool_name.clone();
                let output = output.clone();
                async move {
                    recorder.record(CallEvent::Started(tool_name.clone()));
                    tokio::time::sleep(delay).await;
                    recorder.record(CallEvent::Finished(tool_name));
                    Ok::<_, ToolError>(output)
                }
            })
            .build()
            .expect("recorded tool declaration is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use unitool_core::{CallableTool, InvocationArguments};

    #[tokio::test]
    async fn records_start_and_finish() {
        let recorder = CallRecorder::new();
        let tool = recorder.tool("A", Duration::from_millis(1), json!("a"));

        let result = tool.invoke(InvocationArguments::new()).await;

        assert_eq!(result.render(), "a");
        assert_eq!(
            recorder.events(),
            vec![CallEvent::Started("A".into()), CallEvent::Finished("A".into())]
        );
    }
}
