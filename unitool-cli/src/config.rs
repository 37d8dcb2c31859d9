//! `unitool.toml` loading.
//!
//! ```toml
//! [backend]
//! endpoint = "http://localhost:11434"
//! model = "qwen2.5:32b"
//!
//! [orchestrator]
//! max_iterations = 10
//! allow_concurrent_invocation = false
//!
//! [[mcp_servers]]
//! name = "brave-search"
//! command = "npx"
//! args = ["-y", "@modelcontextprotocol/server-brave-search"]
//! env = { BRAVE_API_KEY = "..." }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use unitool_agent::ollama::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use unitool_agent::{ConfigError, OrchestratorConfig};
use unitool_mcp::McpServerConfig;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "unitool.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub endpoint: String,
    pub model: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub backend: BackendSettings,
    pub orchestrator: OrchestratorConfig,
    pub mcp_servers: Vec<McpServerConfig>,
}

impl CliConfig {
    /// Load `path`, or `unitool.toml` if present, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.model.trim().is_empty() {
            return Err(ConfigError::Validation("backend.model must not be empty".into()));
        }
        for server in &self.mcp_servers {
            if server.name.trim().is_empty() {
                return Err(ConfigError::Validation("mcp_servers entries need a name".into()));
            }
        }
        self.orchestrator.validate()
    }

    /// The orchestrator section with `UNITOOL_*` overrides applied.
    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig, ConfigError> {
        self.orchestrator.clone().with_env_overrides()
    }
}
