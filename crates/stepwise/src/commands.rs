//! Non-interactive commands and session setup

use anyhow::{Context, Result};
use llm_core::{Config, OllamaClient, ProviderConfig, ProviderKind};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use stepwise::agent::{AgentConfig, AgentLoop, NullSink};
use stepwise::tools::builtin::create_default_registry;
use stepwise::tools::SessionContext;

use crate::render::{print_turn_error, TerminalRenderer, BOLD, CYAN, DIM, RESET, YELLOW};

/// Command-line overrides applied on top of stepwise.toml
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub config: Option<PathBuf>,
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub max_steps: Option<usize>,
    pub dir: Option<PathBuf>,
    pub verbose: bool,
}

impl SessionOptions {
    /// Load the config file and apply overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        if let Some(kind) = self.provider {
            config.provider.kind = kind;
        }
        if let Some(ref model) = self.model {
            config.provider.model = Some(model.clone());
        }
        if self.max_steps.is_some() {
            config.agent.max_steps = self.max_steps;
        }

        debug!(?config, "Resolved configuration");
        Ok(config)
    }

    fn working_dir(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => dir
                .canonicalize()
                .with_context(|| format!("Cannot use {} as working directory", dir.display())),
            None => std::env::current_dir().context("Failed to read current directory"),
        }
    }

    /// Build an agent session: model connection, tools and context
    pub async fn build_agent(&self) -> Result<AgentLoop> {
        let config = self.load_config()?;
        if config.provider.kind == ProviderKind::Ollama {
            ensure_ollama_running(&config.provider).await?;
        }

        let model = config
            .provider
            .connect()
            .with_context(|| format!("Failed to set up {} provider", config.provider.kind))?;

        let working_dir = self.working_dir()?;
        info!(working_dir = %working_dir.display(), "Starting session");

        let session = SessionContext::from_settings(&config.tools, working_dir);
        Ok(AgentLoop::new(
            model,
            create_default_registry(),
            session,
            AgentConfig::from_settings(&config.agent),
        ))
    }
}

/// A local Ollama server must answer before a session starts
async fn ensure_ollama_running(provider: &ProviderConfig) -> Result<()> {
    let url = provider.base_url();
    let client = OllamaClient::new(
        &url,
        provider.model_name(),
        Duration::from_secs(provider.timeout_secs),
    )?;

    if !client.health_check().await.unwrap_or(false) {
        anyhow::bail!("Ollama is not running at {}", url);
    }

    debug!(url = %url, "Ollama is reachable");
    Ok(())
}

/// One-shot query
pub async fn ask(opts: &SessionOptions, query: &str, json_output: bool) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("No query provided");
    }

    let mut agent = opts.build_agent().await?;

    let result = if json_output {
        agent.run_turn(query, &mut NullSink).await
    } else {
        let mut renderer = TerminalRenderer::new(opts.verbose);
        let result = agent.run_turn(query, &mut renderer).await;
        renderer.finish();
        result
    };

    match result {
        Ok(outcome) => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            Ok(())
        }
        Err(e) => {
            if json_output {
                println!("{}", json!({ "error": e.to_string() }));
            } else {
                print_turn_error(&e);
            }
            anyhow::bail!("Turn failed")
        }
    }
}

/// List the registered tools
pub fn tools() -> Result<()> {
    let registry = create_default_registry();

    println!("{}Tools:{}", BOLD, RESET);
    for tool in registry.all_tools() {
        println!(
            "  {}{}{} {}[{}]{}",
            CYAN,
            tool.name(),
            RESET,
            DIM,
            tool.security_level(),
            RESET
        );
        for line in tool.description().lines() {
            println!("      {}", line.trim());
        }
    }
    println!();
    println!(
        "{}Note:{} run_command passes any unprefixed input to the system shell.",
        YELLOW, RESET
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stepwise.toml");
        std::fs::write(
            &path,
            "[provider]\nkind = \"openai\"\nmodel = \"gpt-4.1\"\n\n[agent]\nmax_steps = 5\n",
        )
        .unwrap();

        let opts = SessionOptions {
            config: Some(path),
            provider: Some(ProviderKind::Ollama),
            model: Some("llama3.2".to_string()),
            max_steps: Some(9),
            ..Default::default()
        };

        let config = opts.load_config().unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Ollama);
        assert_eq!(config.provider.model_name(), "llama3.2");
        assert_eq!(config.agent.max_steps, Some(9));
    }

    async fn ollama_stub() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_build_agent_with_dir() {
        let dir = TempDir::new().unwrap();
        let opts = SessionOptions {
            config: Some(dir.path().join("missing.toml")),
            ..Default::default()
        };
        assert!(opts.build_agent().await.is_err());

        let server = ollama_stub().await;
        let path = dir.path().join("stepwise.toml");
        std::fs::write(
            &path,
            format!("[provider]\nkind = \"ollama\"\nbase_url = \"{}\"\n", server.uri()),
        )
        .unwrap();
        let opts = SessionOptions {
            config: Some(path),
            dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let agent = opts.build_agent().await.unwrap();
        assert_eq!(agent.session().working_dir, dir.path().canonicalize().unwrap());
        assert_eq!(agent.model_name(), "llama3.2");
    }

    #[tokio::test]
    async fn test_build_agent_fails_when_ollama_is_down() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stepwise.toml");
        std::fs::write(
            &path,
            format!("[provider]\nkind = \"ollama\"\nbase_url = \"{}\"\n", base_url),
        )
        .unwrap();
        let opts = SessionOptions {
            config: Some(path),
            ..Default::default()
        };

        let err = opts.build_agent().await.err().unwrap();
        assert_eq!(err.to_string(), format!("Ollama is not running at {}", base_url));
    }
}
