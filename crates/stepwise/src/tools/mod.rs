//! Tool framework for the agent loop
//!
//! Every tool takes one string argument and produces one string observation.
//! Per-session state (notably the working directory) lives in
//! [`SessionContext`] and is passed by `&mut` into each call instead of
//! touching process-wide state.

pub mod builtin;
pub mod launcher;
pub mod registry;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use llm_core::ToolSettings;

pub use launcher::{Launcher, SystemLauncher};
pub use registry::ToolRegistry;

/// Security classification for tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Read-only operations
    Safe,
    /// Network access
    Moderate,
    /// Write/execute operations, including raw shell commands
    Dangerous,
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityLevel::Safe => write!(f, "safe"),
            SecurityLevel::Moderate => write!(f, "moderate"),
            SecurityLevel::Dangerous => write!(f, "dangerous"),
        }
    }
}

/// State for one agent session, threaded through every tool call
#[derive(Clone)]
pub struct SessionContext {
    /// Session working directory; relative paths resolve against it
    pub working_dir: PathBuf,
    /// Base URL of the weather text service
    pub weather_url: String,
    /// Maximum output length (truncate if exceeded)
    pub max_output_len: usize,
    /// Timeout for shell commands in seconds
    pub command_timeout_secs: u64,
    /// Timeout for HTTP requests in seconds
    pub http_timeout_secs: u64,
    /// Browser and background-server launcher
    pub launcher: Arc<dyn Launcher>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::from_settings(
            &ToolSettings::default(),
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        )
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("working_dir", &self.working_dir)
            .field("weather_url", &self.weather_url)
            .field("max_output_len", &self.max_output_len)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Create a new context with the given working directory
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    /// Build a context from the `[tools]` section of the config file
    pub fn from_settings(settings: &ToolSettings, working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            weather_url: settings.weather_url.clone(),
            max_output_len: settings.max_output_len,
            command_timeout_secs: settings.command_timeout_secs,
            http_timeout_secs: settings.http_timeout_secs,
            launcher: Arc::new(SystemLauncher),
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_weather_url(mut self, url: impl Into<String>) -> Self {
        self.weather_url = url.into();
        self
    }

    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    pub fn with_http_timeout(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    /// Resolve a path against the session working directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

/// A named local capability the model may call with one string argument
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Describe the tool for the system prompt
    fn description(&self) -> &str;

    /// Get the security level
    fn security_level(&self) -> SecurityLevel;

    /// Run the tool. Errors are turned into observation strings by the registry.
    async fn execute(&self, input: &str, ctx: &mut SessionContext) -> Result<String>;
}
