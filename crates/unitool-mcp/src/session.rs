//! [`ToolSession`] over an MCP server.
//!
//! The usual setup spawns the server as a child process and talks MCP over
//! its stdio, as configured by [`McpServerConfig`].

use async_trait::async_trait;
use rmcp::model::{ClientInfo, Implementation};
use rmcp::service::RunningService;
use rmcp::{RoleClient, ServiceExt};
use rmcp::transport::TokioChildProcess;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::process::Command;
use tracing::{debug, info, warn};
use unitool_core::InvocationArguments;
use unitool_tools::{RemoteToolInfo, SessionError, ToolSession};

use crate::convert::{payload_from_result, tool_info_from_value};
use crate::error::{McpError, McpResult};

/// How to start one MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Session name used in logs.
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the server process.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl McpServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    fn to_command(&self) -> McpResult<Command> {
        if self.command.trim().is_empty() {
            return Err(McpError::EmptyCommand);
        }
        let mut command = Command::new(&self.command);
        command.args(&self.args).envs(&self.env);
        Ok(command)
    }
}

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: Default::default(),
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        },
    }
}

/// A live MCP client session.
pub struct McpSession {
    name: String,
    service: RunningService<RoleClient, ClientInfo>,
}

impl std::fmt::Debug for McpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSession").field("name", &self.name).finish()
    }
}

impl McpSession {
    /// Spawn the configured server and complete the MCP handshake.
    pub async fn spawn(config: &McpServerConfig) -> McpResult<Self> {
        let command = config.to_command()?;
        debug!(server = %config.name, command = %config.command, args = ?config.args, "Spawning MCP server");

        let transport = TokioChildProcess::new(command).map_err(|source| McpError::Spawn {
            server: config.name.clone(),
            source,
        })?;
        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;

        info!(server = %config.name, "Connected to MCP server");
        Ok(Self::from_service(config.name.clone(), service))
    }

    /// Wrap an already initialized client service.
    pub fn from_service(name: impl Into<String>, service: RunningService<RoleClient, ClientInfo>) -> Self {
        Self {
            name: name.into(),
            service,
        }
    }

    /// Shut the session down, stopping the server connection.
    pub async fn shutdown(self) -> McpResult<()> {
        debug!(server = %self.name, "Shutting down MCP session");
        self.service
            .cancel()
            .await
            .map(|_| ())
            .map_err(|e| McpError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ToolSession for McpSession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<RemoteToolInfo>, SessionError> {
        let tools = self
            .service
            .peer()
            .list_all_tools()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let mut listing = Vec::with_capacity(tools.len());
        for tool in tools {
            let value = serde_json::to_value(&tool).map_err(McpError::from)?;
            listing.push(tool_info_from_value(value)?);
        }
        debug!(server = %self.name, count = listing.len(), "Listed MCP tools");
        Ok(listing)
    }

    async fn call_tool(&self, name: &str, args: InvocationArguments) -> Result<Value, SessionError> {
        let request = serde_json::from_value(serde_json::json!({
            "name": name,
            "arguments": args,
        }))
        .map_err(McpError::from)?;

        let result = self.service.peer().call_tool(request).await.map_err(|e| {
            warn!(server = %self.name, tool = %name, error = %e, "MCP tool call failed");
            SessionError::Transport(e.to_string())
        })?;

        let value = serde_json::to_value(&result).map_err(McpError::from)?;
        payload_from_result(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_rejected() {
        let config = McpServerConfig::new("empty", "  ");
        assert!(matches!(config.to_command(), Err(McpError::EmptyCommand)));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: McpServerConfig = serde_json::from_value(serde_json::json!({
            "name": "brave-search",
            "command": "npx"
        }))
        .unwrap();
        assert!(config.args.is_empty());
        assert!(config.env.is_empty());
    }

    #[tokio::test]
    async fn spawning_a_missing_binary_fails() {
        let config = McpServerConfig::new("missing", "nonexistent_command_12345");
        let err = McpSession::spawn(&config).await.unwrap_err();
        assert!(matches!(err, McpError::Spawn { .. } | McpError::Connection(_)));
    }
}
