//! Browser and background-server launching

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::info;

/// Side-effecting launches a tool can request.
///
/// Both operations are fire-and-forget: the spawned process is never
/// awaited or cleaned up by the session.
pub trait Launcher: Send + Sync {
    /// Open a URL (http(s) or file://) in the default browser
    fn open_url(&self, url: &str) -> Result<()>;

    /// Start a static file server for `dir` on `port` in the background
    fn spawn_server(&self, port: u16, dir: &Path) -> Result<()>;
}

/// Launches through the platform's own opener and `python3 -m http.server`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open_url(&self, url: &str) -> Result<()> {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]).arg(url);
            c
        } else if cfg!(target_os = "macos") {
            let mut c = Command::new("open");
            c.arg(url);
            c
        } else {
            let mut c = Command::new("xdg-open");
            c.arg(url);
            c
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to open {}", url))?;

        info!(url, "Opened in browser");
        Ok(())
    }

    fn spawn_server(&self, port: u16, dir: &Path) -> Result<()> {
        let port_arg = port.to_string();

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", "cmd", "/k", "python", "-m", "http.server", &port_arg]);
            c
        } else {
            let mut c = Command::new("nohup");
            c.args(["python3", "-m", "http.server", &port_arg]);
            c
        };

        let child = cmd
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to start http.server")?;

        info!(port, pid = child.id(), dir = %dir.display(), "Started background server");
        Ok(())
    }
}
