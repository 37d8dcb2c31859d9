//! Orchestrator configuration with environment variable support.
//!
//! # Environment Variables
//!
//! - `UNITOOL_MAX_ITERATIONS`: backend round-trips per query (default: 10)
//! - `UNITOOL_ALLOW_CONCURRENT_INVOCATION`: run one turn's tool calls
//!   concurrently (default: false)
//! - `UNITOOL_SYSTEM_PROMPT`: system message prepended to every conversation

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Failed to read configuration file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Settings of the conversation loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on backend round-trips for one query.
    pub max_iterations: u32,
    /// Invoke the tool calls of a single turn concurrently. Results are
    /// still appended in request order.
    pub allow_concurrent_invocation: bool,
    pub system_prompt: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            allow_concurrent_invocation: false,
            system_prompt: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }

    /// Defaults overridden by `UNITOOL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        OrchestratorConfigBuilder::from_env()?.build()
    }

    /// Apply `UNITOOL_*` environment overrides on top of this configuration.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        OrchestratorConfigBuilder::from(self)
            .apply_overrides(|key| env::var(key).ok())?
            .build()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Validation(
                "max_iterations must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`OrchestratorConfig`].
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl From<OrchestratorConfig> for OrchestratorConfigBuilder {
    fn from(config: OrchestratorConfig) -> Self {
        Self { config }
    }
}

impl OrchestratorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any environment variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new().apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides read through `lookup`, which maps a variable name to
    /// its value.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(max) = parse_u32(&lookup, "UNITOOL_MAX_ITERATIONS")? {
            self = self.max_iterations(max);
        }
        if let Some(concurrent) = parse_bool(&lookup, "UNITOOL_ALLOW_CONCURRENT_INVOCATION")? {
            self = self.allow_concurrent_invocation(concurrent);
        }
        if let Some(prompt) = lookup("UNITOOL_SYSTEM_PROMPT") {
            self = self.system_prompt(prompt);
        }
        Ok(self)
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn allow_concurrent_invocation(mut self, allow: bool) -> Self {
        self.config.allow_concurrent_invocation = allow;
        self
    }

    /// An empty prompt clears the system message.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.config.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the configuration is invalid.
    pub fn build(self) -> Result<OrchestratorConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// Environment variable helper functions

fn parse_bool<F>(lookup: &F, key: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!(
                    "invalid boolean value '{val}', expected true/false/1/0/yes/no/on/off"
                ),
            }),
        },
        None => Ok(None),
    }
}

fn parse_u32<F>(lookup: &F, key: &str) -> Result<Option<u32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => val
            .parse::<u32>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u32 value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_builder() {
        let config = OrchestratorConfig::builder().build().unwrap();
        assert_eq!(config.max_iterations, 10);
        assert!(!config.allow_concurrent_invocation);
        assert!(config.system_prompt.is_none());
    }

    #[test]
    fn test_builder_validation_max_iterations() {
        let result = OrchestratorConfig::builder().max_iterations(0).build();
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("max_iterations must be greater than 0")
        );
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = OrchestratorConfigBuilder::new()
            .apply_overrides(lookup(&[
                ("UNITOOL_MAX_ITERATIONS", "3"),
                ("UNITOOL_ALLOW_CONCURRENT_INVOCATION", "yes"),
                ("UNITOOL_SYSTEM_PROMPT", "Be brief."),
            ]))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.max_iterations, 3);
        assert!(config.allow_concurrent_invocation);
        assert_eq!(config.system_prompt.as_deref(), Some("Be brief."));
    }

    #[test]
    fn test_invalid_env_values() {
        let err = OrchestratorConfigBuilder::new()
            .apply_overrides(lookup(&[("UNITOOL_MAX_ITERATIONS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref key, .. } if key == "UNITOOL_MAX_ITERATIONS"));

        let err = OrchestratorConfigBuilder::new()
            .apply_overrides(lookup(&[("UNITOOL_ALLOW_CONCURRENT_INVOCATION", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("invalid boolean value 'maybe'"));
    }

    #[test]
    fn test_empty_system_prompt_is_cleared() {
        let config = OrchestratorConfig::builder()
            .system_prompt("  ")
            .build()
            .unwrap();
        assert!(config.system_prompt.is_none());
    }

    #[test]
    fn test_deserialize_partial_section() {
        let config: OrchestratorConfig =
            serde_json::from_value(serde_json::json!({"max_iterations": 4})).unwrap();
        assert_eq!(config.max_iterations, 4);
        assert!(!config.allow_concurrent_invocation);
    }
}
