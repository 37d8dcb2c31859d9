use thiserror::Error;
use unitool_agent::{AgentError, ConfigError};
use unitool_mcp::McpError;
use unitool_tools::RegistryError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Mcp(#[from] McpError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("Invalid --args: {0}")]
    InvalidArguments(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
