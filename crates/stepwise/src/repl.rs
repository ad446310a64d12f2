//! Interactive REPL
//!
//! Each line is one user query, run to completion before the next prompt.
//! Lines starting with `/` are session commands.

use anyhow::{Context, Result};
use llm_core::Role;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use tracing::warn;

use stepwise::agent::AgentLoop;

use crate::commands::SessionOptions;
use crate::render::{
    preview, print_turn_error, TerminalRenderer, BLUE, BOLD, CYAN, DIM, GREEN, RESET, YELLOW,
};

/// Run the interactive REPL
pub async fn run(opts: &SessionOptions) -> Result<()> {
    let mut agent = opts.build_agent().await?;

    let history_path = history_path();
    let mut rl = DefaultEditor::new()?;
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    print_welcome(&agent);

    loop {
        let prompt = format!("{}stepwise>{} ", CYAN, RESET);

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if line.starts_with('/') {
                    if handle_slash_command(&agent, line) {
                        break;
                    }
                    continue;
                }

                let mut renderer = TerminalRenderer::new(opts.verbose);
                let result = agent.run_turn(line, &mut renderer).await;
                renderer.finish();

                if let Err(e) = result {
                    print_turn_error(&e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}^C{}", DIM, RESET);
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}Goodbye!{}", DIM, RESET);
                break;
            }
            Err(e) => {
                eprintln!("{}Error:{} {}", YELLOW, RESET, e);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        if let Err(e) = rl.save_history(path) {
            warn!(error = %e, path = %path.display(), "Failed to save input history");
        }
    }

    Ok(())
}

/// Input history lives under the platform data directory
fn history_path() -> Option<PathBuf> {
    let dir = dirs::data_dir()?.join("stepwise");
    match std::fs::create_dir_all(&dir).context("Failed to create data directory") {
        Ok(()) => Some(dir.join("history.txt")),
        Err(e) => {
            warn!(error = %e, "Input history disabled");
            None
        }
    }
}

fn print_welcome(agent: &AgentLoop) {
    println!();
    println!("{}stepwise{} - plan, act, observe", BOLD, RESET);
    println!("{}Model:{} {}{}{}", DIM, RESET, BLUE, agent.model_name(), RESET);
    println!(
        "{}Tools:{} {}",
        DIM,
        RESET,
        agent.registry().list_names().join(", ")
    );
    println!("Type {}/help{} for commands", CYAN, RESET);
    println!();
}

/// Handle a slash command; returns true when the REPL should exit
fn handle_slash_command(agent: &AgentLoop, input: &str) -> bool {
    let cmd = input.split_whitespace().next().unwrap_or("").to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => print_help(),
        "/exit" | "/quit" | "/q" => {
            println!("{}Goodbye!{}", DIM, RESET);
            return true;
        }
        "/history" | "/hist" => print_history(agent),
        "/cwd" => println!("{}", agent.session().working_dir.display()),
        "/tools" => {
            for tool in agent.registry().all_tools() {
                println!("  {}{}{} [{}]", CYAN, tool.name(), RESET, tool.security_level());
            }
        }
        _ => {
            println!("{}Unknown command:{} {}", YELLOW, RESET, cmd);
            println!("Type {}/help{} for available commands", CYAN, RESET);
        }
    }

    false
}

fn print_help() {
    println!();
    println!("{}Commands:{}", BOLD, RESET);
    println!("  {}/help{}, /h, /?      Show this help", CYAN, RESET);
    println!("  {}/history{}          Show the conversation transcript", CYAN, RESET);
    println!("  {}/cwd{}              Show the session working directory", CYAN, RESET);
    println!("  {}/tools{}            List available tools", CYAN, RESET);
    println!("  {}/exit{}, /q         Exit", CYAN, RESET);
    println!();
}

fn print_history(agent: &AgentLoop) {
    println!("{}Transcript:{}", BOLD, RESET);
    for (i, msg) in agent.transcript().messages().iter().enumerate() {
        let role_color = match msg.role {
            Role::System => YELLOW,
            Role::User => CYAN,
            Role::Assistant => GREEN,
        };
        println!(
            "  {}[{}]{} {}{}:{} {}",
            DIM,
            i + 1,
            RESET,
            role_color,
            msg.role,
            RESET,
            preview(&msg.content, 60).replace('\n', " ")
        );
    }
}
