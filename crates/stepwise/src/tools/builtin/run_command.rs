//! The `run_command` tool and its prefix mini-language
//!
//! Input is either one of the prefixed sub-commands below or, failing that,
//! a raw command line handed to the native shell:
//!
//! - `create_file:<filename>:<content>`
//! - `open_in_browser:<url or path>`
//! - `start_server:<port>`
//! - `change_dir:<path>`

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use tracing::{debug, info};

use super::shell::run_shell;
use crate::tools::{SecurityLevel, SessionContext, Tool};

const CREATE_FILE: &str = "create_file:";
const OPEN_IN_BROWSER: &str = "open_in_browser:";
const START_SERVER: &str = "start_server:";
const CHANGE_DIR: &str = "change_dir:";

/// A parsed `run_command` input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunCommand {
    CreateFile { filename: String, content: String },
    OpenInBrowser { target: String },
    StartServer { port: u16 },
    ChangeDir { path: String },
    /// Unrestricted native shell command. Anything without a known prefix
    /// lands here and is executed as-is.
    RawShell(String),
}

impl RunCommand {
    pub fn parse(input: &str) -> Result<Self> {
        if input.starts_with(CREATE_FILE) {
            // Only the first two colons separate fields; content keeps the rest
            let mut parts = input.splitn(3, ':').skip(1);
            let filename = parts.next().unwrap_or_default().trim();
            let content = parts
                .next()
                .context("create_file expects create_file:<filename>:<content>")?;
            if filename.is_empty() {
                anyhow::bail!("create_file needs a filename");
            }
            return Ok(RunCommand::CreateFile {
                filename: filename.to_string(),
                content: content.to_string(),
            });
        }

        if let Some(rest) = input.strip_prefix(OPEN_IN_BROWSER) {
            return Ok(RunCommand::OpenInBrowser {
                target: rest.trim().to_string(),
            });
        }

        if let Some(rest) = input.strip_prefix(START_SERVER) {
            let port = rest
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid port '{}'", rest.trim()))?;
            return Ok(RunCommand::StartServer { port });
        }

        if let Some(rest) = input.strip_prefix(CHANGE_DIR) {
            return Ok(RunCommand::ChangeDir {
                path: rest.trim().to_string(),
            });
        }

        Ok(RunCommand::RawShell(input.to_string()))
    }

    /// Carry out the command against the session
    pub async fn run(self, ctx: &mut SessionContext) -> Result<String> {
        match self {
            RunCommand::CreateFile { filename, content } => {
                let path = ctx.resolve(&filename);
                if let Some(parent) = path.parent() {
                    if !parent.exists() {
                        fs::create_dir_all(parent).with_context(|| {
                            format!("Failed to create directories for {}", path.display())
                        })?;
                    }
                }
                fs::write(&path, &content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), bytes = content.len(), "Created file");
                Ok(format!("{} created successfully.", filename))
            }
            RunCommand::OpenInBrowser { target } => {
                if target.starts_with("http://") || target.starts_with("https://") {
                    ctx.launcher.open_url(&target)?;
                    return Ok(format!("{} opened in browser.", target));
                }

                let path = ctx.resolve(&target);
                if !path.exists() {
                    debug!(path = %path.display(), "Browser target missing");
                    return Ok(format!("Error: {} does not exist.", target));
                }
                let absolute = path
                    .canonicalize()
                    .with_context(|| format!("Failed to resolve {}", path.display()))?;
                ctx.launcher
                    .open_url(&format!("file://{}", absolute.display()))?;
                Ok(format!("{} opened in browser.", target))
            }
            RunCommand::StartServer { port } => {
                ctx.launcher.spawn_server(port, &ctx.working_dir)?;
                Ok(format!("Server started on http://localhost:{}", port))
            }
            RunCommand::ChangeDir { path } => {
                let dir = ctx
                    .resolve(&path)
                    .canonicalize()
                    .with_context(|| format!("Cannot change directory to {}", path))?;
                if !dir.is_dir() {
                    anyhow::bail!("{} is not a directory", dir.display());
                }
                info!(from = %ctx.working_dir.display(), to = %dir.display(), "Changed session directory");
                ctx.working_dir = dir;
                Ok(format!("Changed directory to {}", ctx.working_dir.display()))
            }
            RunCommand::RawShell(command) => {
                info!(command = %command, "Running raw shell command");
                run_shell(&command, ctx).await
            }
        }
    }
}

/// Tool exposing file creation, browser, server, directory and shell commands
pub struct RunCommandTool;

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Takes a shell command and returns its output, or one of:\n    \
         - `create_file:<filename>:<content>` to create a file\n    \
         - `open_in_browser:<filename_or_url>` to open a local file or URL\n    \
         - `start_server:<port>` to start a web server in the current directory\n    \
         - `change_dir:<path>` to change the working directory"
    }

    fn security_level(&self) -> SecurityLevel {
        SecurityLevel::Dangerous
    }

    async fn execute(&self, input: &str, ctx: &mut SessionContext) -> Result<String> {
        RunCommand::parse(input)?.run(ctx).await
    }
}
