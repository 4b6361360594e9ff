//! Configuration types for pentagent runs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Error, Result};

/// LLM provider selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    #[default]
    Ollama,
    OpenAi,
    LiteLlm,
}

impl std::str::FromStr for ProviderName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "litellm" => Ok(Self::LiteLlm),
            other => Err(Error::Config(format!("Unknown provider: {}", other))),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub name: ProviderName,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_model() -> String {
    "llama3".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: ProviderName::Ollama,
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

impl ProviderConfig {
    /// Apply a `provider/model` spec such as `ollama/llama3`.
    ///
    /// A bare model name keeps the configured provider. Other settings are
    /// retained only when the provider does not change.
    pub fn apply_model_spec(&mut self, spec: &str) -> Result<()> {
        match spec.split_once('/') {
            Some((provider, model)) if !model.is_empty() => {
                let name: ProviderName = provider.parse()?;
                if name != self.name {
                    self.base_url = None;
                }
                self.name = name;
                self.model = model.to_string();
            }
            _ if !spec.is_empty() && !spec.ends_with('/') => self.model = spec.to_string(),
            _ => return Err(Error::Config(format!("Invalid model spec: {:?}", spec))),
        }
        Ok(())
    }
}

/// One tool backend reachable over stdio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl BackendConfig {
    /// `docker exec -i mcp-<name> python3 <name>_server.py`
    pub fn docker_exec(name: &str) -> Self {
        Self {
            name: name.to_string(),
            command: "docker".to_string(),
            args: vec![
                "exec".to_string(),
                "-i".to_string(),
                format!("mcp-{}", name),
                "python3".to_string(),
                format!("{}_server.py", name),
            ],
        }
    }
}

fn default_backends() -> Vec<BackendConfig> {
    ["kali", "websearch", "rag", "zap"]
        .iter()
        .map(|name| BackendConfig::docker_exec(name))
        .collect()
}

/// Tool invocation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Per-call timeout
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    /// Operations that receive the resolved address instead of the target
    #[serde(default = "default_address_operations")]
    pub address_operations: Vec<String>,
}

fn default_call_timeout() -> u64 {
    300
}

fn default_address_operations() -> Vec<String> {
    vec!["nmap".into(), "nuclei".into(), "hydra".into()]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout(),
            address_operations: default_address_operations(),
        }
    }
}

/// Intent detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Confidence attached to every intent decision; the decision step does
    /// not compute one.
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default = "default_target")]
    pub default_target: String,
}

/// Fixed intent confidence
pub const DEFAULT_INTENT_CONFIDENCE: f32 = 0.8;

fn default_confidence() -> f32 {
    DEFAULT_INTENT_CONFIDENCE
}

fn default_target() -> String {
    "example.com".to_string()
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            confidence: default_confidence(),
            default_target: default_target(),
        }
    }
}

/// Autonomous loop budgets and tool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLoopConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_time_budget")]
    pub time_budget_secs: u64,
    #[serde(default = "default_repetition_window")]
    pub repetition_window: usize,
    #[serde(default = "default_kali_container")]
    pub kali_container: String,
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,
    #[serde(default = "default_browse_timeout")]
    pub browse_timeout_secs: u64,
}

fn default_max_steps() -> usize {
    10
}

fn default_time_budget() -> u64 {
    600
}

fn default_repetition_window() -> usize {
    4
}

fn default_kali_container() -> String {
    "mcp-kali".to_string()
}

fn default_shell_timeout() -> u64 {
    60
}

fn default_browse_timeout() -> u64 {
    30
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            time_budget_secs: default_time_budget(),
            repetition_window: default_repetition_window(),
            kali_container: default_kali_container(),
            shell_timeout_secs: default_shell_timeout(),
            browse_timeout_secs: default_browse_timeout(),
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub intent: IntentConfig,
    #[serde(default)]
    pub agent: AgentLoopConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            backends: default_backends(),
            tools: ToolsConfig::default(),
            intent: IntentConfig::default(),
            agent: AgentLoopConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations with cascade:
    /// 1. ./pentagent.toml (local override)
    /// 2. ~/.pentagent/config.toml (global defaults)
    /// 3. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(config) = Self::from_file("pentagent.toml") {
            return config;
        }

        if let Some(global_path) = Self::global_config_path()
            && let Ok(config) = Self::from_file(&global_path)
        {
            return config;
        }

        Self::default()
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pentagent").join("config.toml"))
    }

    /// Expand `${VAR}` references in secret fields
    pub fn expand_env_vars(&mut self) {
        if let Some(key) = self.provider.api_key.as_deref()
            && let Some(var_name) = key.strip_prefix("${").and_then(|k| k.strip_suffix('}'))
            && let Ok(value) = std::env::var(var_name)
        {
            self.provider.api_key = Some(value);
        }
    }

    /// Find a backend by name
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name == name)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.intent.confidence) {
            return Err(Error::Config(format!(
                "intent.confidence must be within [0, 1], got {}",
                self.intent.confidence
            )));
        }
        if self.agent.max_steps == 0 {
            return Err(Error::Config("agent.max_steps must be at least 1".into()));
        }
        Ok(())
    }
}
