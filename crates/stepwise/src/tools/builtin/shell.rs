//! Native shell execution for raw `run_command` input

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::tools::SessionContext;

/// Run `command` through the platform shell in the session working directory.
///
/// Returns stdout followed by stderr, verbatim. A non-zero exit status is
/// logged but not reported, so the caller sees the same kind of string
/// whether the command succeeded or not.
pub(crate) async fn run_shell(command: &str, ctx: &SessionContext) -> Result<String> {
    if !ctx.working_dir.is_dir() {
        anyhow::bail!(
            "Working directory does not exist: {}",
            ctx.working_dir.display()
        );
    }

    let (shell, shell_arg) = if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    };

    let mut cmd = Command::new(shell);
    cmd.arg(shell_arg)
        .arg(command)
        .current_dir(&ctx.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = timeout(Duration::from_secs(ctx.command_timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            anyhow::anyhow!("Command timed out after {} seconds", ctx.command_timeout_secs)
        })?
        .context("Failed to execute command")?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        debug!(output_len = combined.len(), "Command finished");
    } else {
        warn!(status = ?output.status.code(), "Command exited with non-zero status");
    }

    Ok(truncate_output(combined, ctx.max_output_len))
}

fn truncate_output(mut output: String, max_len: usize) -> String {
    if output.len() <= max_len {
        return output;
    }

    let mut cut = max_len;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    output.truncate(cut);
    output.push_str(&format!("\n\n[Output truncated at {} bytes]", max_len));
    output
}
