//! Configuration management for stepwise.toml

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::chat::ChatModel;
use crate::ollama::{OllamaClient, DEFAULT_OLLAMA_URL};
use crate::openai::{OpenAiClient, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL};

pub const CONFIG_FILE_NAME: &str = "stepwise.toml";
pub const DOTENV_FILE_NAME: &str = ".env";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub tools: ToolSettings,
}

/// Which chat backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Ollama,
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            other => anyhow::bail!("Unknown provider '{}' (expected openai or ollama)", other),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    /// Model name; falls back to the provider's default
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL; falls back to the provider's default
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key (openai only)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSettings {
    /// Optional cap on model calls per turn; unbounded when unset
    #[serde(default)]
    pub max_steps: Option<usize>,
    /// Replaces the built-in system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_max_output_len")]
    pub max_output_len: usize,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_weather_url() -> String {
    "https://wttr.in".to_string()
}

fn default_command_timeout() -> u64 {
    120
}

fn default_http_timeout() -> u64 {
    30
}

fn default_max_output_len() -> usize {
    50000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            model: None,
            base_url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            weather_url: default_weather_url(),
            command_timeout_secs: default_command_timeout(),
            http_timeout_secs: default_http_timeout(),
            max_output_len: default_max_output_len(),
        }
    }
}

impl ProviderConfig {
    /// Model name, defaulted per provider
    pub fn model_name(&self) -> String {
        match (&self.model, self.kind) {
            (Some(m), _) => m.clone(),
            (None, ProviderKind::OpenAi) => DEFAULT_OPENAI_MODEL.to_string(),
            (None, ProviderKind::Ollama) => "llama3.2".to_string(),
        }
    }

    /// Base URL, defaulted per provider
    pub fn base_url(&self) -> String {
        match (&self.base_url, self.kind) {
            (Some(u), _) => u.clone(),
            (None, ProviderKind::OpenAi) => DEFAULT_OPENAI_URL.to_string(),
            (None, ProviderKind::Ollama) => DEFAULT_OLLAMA_URL.to_string(),
        }
    }

    /// Build the configured chat backend
    pub fn connect(&self) -> Result<Box<dyn ChatModel>> {
        let timeout = Duration::from_secs(self.timeout_secs);
        let model: Box<dyn ChatModel> = match self.kind {
            ProviderKind::OpenAi => Box::new(OpenAiClient::from_env(
                self.base_url(),
                self.model_name(),
                &self.api_key_env,
                timeout,
            )?),
            ProviderKind::Ollama => {
                Box::new(OllamaClient::new(self.base_url(), self.model_name(), timeout)?)
            }
        };
        Ok(model)
    }
}

impl Config {
    /// Load configuration from stepwise.toml, or defaults if none is found
    pub fn load() -> Result<Self> {
        match Self::find_config_path() {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }

    /// Find stepwise.toml by searching current directory and parents
    pub fn find_config_path() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        find_upwards(&current, CONFIG_FILE_NAME)
    }
}

/// Load the nearest `.env` at or above `start` into the process environment.
///
/// Variables that are already set keep their values. Returns the file that was loaded.
pub fn load_dotenv(start: &Path) -> Option<PathBuf> {
    let path = find_upwards(start, DOTENV_FILE_NAME)?;

    match dotenvy::from_path(&path) {
        Ok(()) => Some(path),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Failed to load .env file");
            None
        }
    }
}

fn find_upwards(start: &Path, file_name: &str) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    for _ in 0..10 {
        let candidate = current.join(file_name);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }

    None
}
