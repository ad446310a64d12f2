//! stepwise: tool-using chat agent for the terminal
//!
//! The model plans, calls local tools and observes their results until it
//! produces an answer.

mod commands;
mod render;
mod repl;

use anyhow::Result;
use clap::{Parser, Subcommand};
use llm_core::ProviderKind;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::SessionOptions;

#[derive(Debug, Parser)]
#[command(name = "stepwise")]
#[command(about = "Plan/action/observe agent with local tools", version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (debug logs, tool observations)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to stepwise.toml (default: search current directory and parents)
    #[arg(long, global = true, env = "STEPWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Chat provider: openai or ollama
    #[arg(long, global = true)]
    provider: Option<ProviderKind>,

    /// Model to use (overrides config)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Stop a turn after this many model calls
    #[arg(long, global = true)]
    max_steps: Option<usize>,

    /// Initial working directory for tools
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start interactive chat REPL
    Chat,

    /// One-shot query (non-interactive)
    Ask {
        /// The query to send
        query: Vec<String>,

        /// Output the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is loaded before parsing so it can supply STEPWISE_CONFIG too
    let dotenv_path = std::env::current_dir()
        .ok()
        .and_then(|dir| llm_core::load_dotenv(&dir));
    let cli = Cli::parse();

    // Logs go to stderr; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = dotenv_path {
        debug!(path = %path.display(), "Loaded environment from .env");
    }

    let opts = SessionOptions {
        config: cli.config,
        provider: cli.provider,
        model: cli.model,
        max_steps: cli.max_steps,
        dir: cli.dir,
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Commands::Ask { query, json }) => commands::ask(&opts, &query.join(" "), json).await,
        Some(Commands::Tools) => commands::tools(),
        Some(Commands::Chat) | None => repl::run(&opts).await,
    }
}
