//! Orchestrator configuration
//!
//! A single TOML file supplies the caller-facing server settings, the
//! classifier oracle, the dispatch timeout and the static agent registry.
//! Secrets are never stored in the file: the oracle API key is read from
//! the environment variable named by `llm.api_key_env`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Main orchestrator configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub llm: LlmSection,
    #[serde(default)]
    pub dispatch: DispatchSection,
    #[serde(default)]
    pub agents: Vec<AgentEntry>,
}

/// Caller-facing HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on one query from receipt to response
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    60
}

/// Classifier oracle settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name ("gemini", "openai", "anthropic")
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Environment variable containing API key
    pub api_key_env: String,
    /// Optional temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Optional max tokens for the classification reply
    pub max_tokens: Option<u32>,
    /// Upper bound on a single classifier call
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
    /// Optional base URL override (proxies, local gateways, tests)
    pub base_url: Option<String>,
}

impl LlmSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_classifier_timeout() -> u64 {
    30
}

/// Worker dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchSection {
    #[serde(default = "default_dispatch_timeout")]
    pub timeout_secs: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_dispatch_timeout(),
        }
    }
}

impl DispatchSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_dispatch_timeout() -> u64 {
    10
}

/// One worker in the static registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentEntry {
    /// Registry key, also the value the classifier must answer with
    pub id: String,
    pub name: String,
    pub description: String,
    /// Query endpoint, e.g. `http://localhost:8001/query`
    pub endpoint: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid agent ID format: {0}")]
    InvalidAgentId(String),
    #[error("Duplicate agent ID: {0}")]
    DuplicateAgentId(String),
    #[error("Invalid endpoint for agent '{agent_id}': {reason}")]
    InvalidEndpoint { agent_id: String, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OrchestratorConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: OrchestratorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate registry entries and timeouts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "at least one [[agents]] entry is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            validate_agent_id(&agent.id)?;
            if !seen.insert(agent.id.as_str()) {
                return Err(ConfigError::DuplicateAgentId(agent.id.clone()));
            }
            validate_endpoint(&agent.id, &agent.endpoint)?;
            if agent.name.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(format!(
                    "agent '{}' must have a name",
                    agent.id
                )));
            }
        }

        if self.dispatch.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "dispatch.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "llm.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "server.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature {temperature} is outside 0.0..=2.0"
                )));
            }
        }

        Ok(())
    }

    /// Get LLM API key from environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.llm.api_key_env.clone()))
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[llm]
provider = "gemini"
model = "gemini-pro"
api_key_env = "GOOGLE_API_KEY"

[[agents]]
id = "research_agent"
name = "Research Agent"
description = "Finds and verifies information"
endpoint = "http://localhost:8001/query"
capabilities = ["information_retrieval", "fact_checking"]

[[agents]]
id = "content_writer"
name = "Content Writing Agent"
description = "Creates and edits written content"
endpoint = "http://localhost:8002/query"
capabilities = ["content_creation", "editing"]
"#;
        Self::from_toml_str(toml_content).expect("Test config should parse")
    }
}

/// Validate agent ID format
fn validate_agent_id(agent_id: &str) -> Result<(), ConfigError> {
    let valid_chars = agent_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if agent_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidAgentId(format!(
            "Agent ID '{agent_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}

fn validate_endpoint(agent_id: &str, endpoint: &str) -> Result<(), ConfigError> {
    let url = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
        agent_id: agent_id.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidEndpoint {
            agent_id: agent_id.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 9000
request_timeout_secs = 45

[llm]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"
temperature = 0.1
max_tokens = 200
timeout_secs = 15

[dispatch]
timeout_secs = 5

[[agents]]
id = "research_agent"
name = "Research Agent"
description = "Finds information"
endpoint = "http://localhost:8001/query"
capabilities = ["information_retrieval"]
"#;

        let config = OrchestratorConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(45));
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.temperature, Some(0.1));
        assert_eq!(config.llm.timeout(), Duration::from_secs(15));
        assert_eq!(config.dispatch.timeout(), Duration::from_secs(5));
        assert_eq!(config.agents.len(), 1);
    }

    #[test]
    fn test_defaults_applied() {
        let config = OrchestratorConfig::test_config();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.request_timeout_secs, 60);
        assert_eq!(config.dispatch.timeout_secs, 10);
        assert_eq!(config.llm.timeout_secs, 30);
        assert!(config.llm.base_url.is_none());
    }

    #[test]
    fn test_agents_keep_file_order() {
        let config = OrchestratorConfig::test_config();
        let ids: Vec<_> = config.agents.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["research_agent", "content_writer"]);
    }

    #[test]
    fn test_invalid_agent_id() {
        assert!(validate_agent_id("invalid@agent").is_err());
        assert!(validate_agent_id("").is_err());
        assert!(validate_agent_id("valid-agent_123.test").is_ok());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(validate_endpoint("a", "not a url").is_err());
        assert!(validate_endpoint("a", "ftp://example.com/query").is_err());
        assert!(validate_endpoint("a", "https://example.com/query").is_ok());
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let mut config = OrchestratorConfig::test_config();
        let duplicate = config.agents[0].clone();
        config.agents.push(duplicate);

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateAgentId(id)) if id == "research_agent"
        ));
    }

    #[test]
    fn test_empty_registry_rejected() {
        let mut config = OrchestratorConfig::test_config();
        config.agents.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = OrchestratorConfig::test_config();
        config.dispatch.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let mut config = OrchestratorConfig::test_config();
        config.llm.temperature = Some(3.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_api_key_env() {
        let mut config = OrchestratorConfig::test_config();
        config.llm.api_key_env = "ORCHESTRATOR_TEST_UNSET_KEY_VAR".to_string();
        assert!(matches!(
            config.get_llm_api_key(),
            Err(ConfigError::EnvVarNotFound(name)) if name == "ORCHESTRATOR_TEST_UNSET_KEY_VAR"
        ));
    }
}
