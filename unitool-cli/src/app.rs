//! Subcommand implementations.

use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info};
use unitool_agent::{AgentError, CancellationToken, ConversationOrchestrator};
use unitool_core::{InvocationArguments, InvocationResult};
use unitool_mcp::McpSession;
use unitool_tools::ToolRegistry;

use crate::config::CliConfig;
use crate::error::CliError;
use crate::providers::{CalculatorService, CitySamples, WeatherService};

/// Connect the configured MCP servers, then add the demo providers.
pub async fn build_registry(config: &CliConfig) -> Result<ToolRegistry, CliError> {
    let mut registry = ToolRegistry::new();

    for server in &config.mcp_servers {
        let session = McpSession::spawn(server).await?;
        let count = registry.register_remote(Arc::new(session)).await?;
        info!(server = %server.name, tools = count, "Registered MCP tools");
    }

    registry.register_in_process(&WeatherService::new())?;
    registry.register_in_process(&CalculatorService)?;
    registry.register_in_process(&CitySamples)?;
    Ok(registry)
}

pub fn print_tools(registry: &ToolRegistry, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Available unified tools:")?;
    for tool in registry.list() {
        writeln!(out, "- {}: {}", tool.name, tool.description)?;
    }
    Ok(())
}

/// Invoke one tool directly with a JSON object of arguments.
pub async fn call_tool(registry: &ToolRegistry, name: &str, args: &str) -> Result<InvocationResult, CliError> {
    let arguments: InvocationArguments = match serde_json::from_str(args) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(other) => {
            return Err(CliError::InvalidArguments(format!(
                "expected a JSON object, got {other}"
            )));
        }
        Err(e) => return Err(CliError::InvalidArguments(e.to_string())),
    };
    Ok(registry.invoke(name, arguments).await)
}

/// Answer one query, writing the answer to `out` as it arrives.
pub async fn answer(
    orchestrator: &ConversationOrchestrator,
    prompt: &str,
    stream: bool,
    cancel: CancellationToken,
    out: &mut impl Write,
) -> Result<String, CliError> {
    let text = if stream {
        let mut chunks = orchestrator.chat_stream(prompt, cancel);
        let mut text = String::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            write!(out, "{chunk}")?;
            out.flush()?;
            text.push_str(&chunk);
        }
        text
    } else {
        let outcome = orchestrator.run(prompt, &cancel).await?;
        write!(out, "{}", outcome.answer)?;
        outcome.answer
    };
    writeln!(out)?;
    Ok(text)
}

fn cancel_on_ctrl_c(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

/// Read queries until an empty line, `exit` or end of input.
///
/// Ctrl-C cancels the query in flight. Backend failures are reported and
/// the loop continues with the next query.
pub async fn chat_loop<R>(
    orchestrator: &ConversationOrchestrator,
    input: R,
    out: &mut impl Write,
    stream: bool,
) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        write!(out, "Your Query: ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() || query.eq_ignore_ascii_case("exit") {
            break;
        }

        write!(out, "Answer: ")?;
        let cancel = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(cancel.clone());
        let result = answer(orchestrator, query, stream, cancel, out).await;
        watcher.abort();

        match result {
            Ok(_) => {}
            Err(CliError::Agent(AgentError::Cancelled)) => writeln!(out, "\n[cancelled]")?,
            Err(CliError::Agent(e)) => {
                error!(error = %e, code = e.error_code(), "Query failed");
                writeln!(out, "\n[error] {e}")?;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
