//! Terminal rendering of agent events

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use stepwise::agent::{AgentEvent, EventSink, TurnError};

// ANSI colors
pub const GREEN: &str = "\x1b[92m";
pub const BLUE: &str = "\x1b[94m";
pub const YELLOW: &str = "\x1b[93m";
pub const RED: &str = "\x1b[91m";
pub const CYAN: &str = "\x1b[96m";
pub const DIM: &str = "\x1b[2m";
pub const BOLD: &str = "\x1b[1m";
pub const RESET: &str = "\x1b[0m";

const OBSERVATION_PREVIEW: usize = 200;

/// Prints plan/action/output events and shows a spinner during model calls
pub struct TerminalRenderer {
    spinner: Option<ProgressBar>,
    show_observations: bool,
}

impl TerminalRenderer {
    pub fn new(show_observations: bool) -> Self {
        Self {
            spinner: None,
            show_observations,
        }
    }

    fn start_spinner(&mut self, message: String) {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let pb = ProgressBar::new_spinner();
        pb.set_style(style);
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(pb);
    }

    /// Clear the spinner if one is running
    pub fn finish(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl EventSink for TerminalRenderer {
    fn emit(&mut self, event: AgentEvent) {
        self.finish();

        match event {
            AgentEvent::Thinking { step } => {
                let message = if step == 1 {
                    "Thinking...".to_string()
                } else {
                    format!("Thinking... (step {})", step)
                };
                self.start_spinner(message);
            }
            AgentEvent::Plan(content) => {
                println!("{}[plan]{} {}", BLUE, RESET, content);
            }
            AgentEvent::Action { function, input } => {
                println!("{}[tool]{} {} with input: {}", YELLOW, RESET, function, input);
            }
            AgentEvent::Observation { output, .. } => {
                if self.show_observations {
                    println!(
                        "{}[observe]{} {}",
                        DIM,
                        RESET,
                        preview(&output, OBSERVATION_PREVIEW).replace('\n', " ")
                    );
                }
            }
            AgentEvent::Output(content) => {
                println!();
                println!("{}{}{}", GREEN, content, RESET);
                println!();
            }
        }
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Print a failed turn
pub fn print_turn_error(err: &TurnError) {
    let label = match err {
        TurnError::Model(_) => "Model error",
        TurnError::Protocol(_) => "Protocol error",
        TurnError::UnknownTool(_) => "Unknown tool",
        TurnError::StepLimit(_) => "Step limit",
    };
    eprintln!("{}{}:{} {}", RED, label, RESET, err);
}

/// First `max` characters of `s`, with an ellipsis when cut
pub fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
