//! Agent configuration, transcript and turn events

use llm_core::{AgentSettings, ChatMessage};
use serde::Serialize;

/// Configuration for the agent
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    /// System prompt; the built-in prompt is used when unset
    pub system_prompt: Option<String>,
    /// Maximum model calls per turn; unbounded when unset
    pub max_steps: Option<usize>,
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            system_prompt: settings.system_prompt.clone(),
            max_steps: settings.max_steps,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_steps(mut self, max: Option<usize>) -> Self {
        self.max_steps = max;
        self
    }
}

/// Ordered conversation state sent to the model on every call.
///
/// Append-only: entries are never removed or reordered, and the first
/// entry is always the system message.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// Successful end of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    /// Final answer from the `output` step
    pub answer: String,
    /// Model calls made during the turn
    pub steps: usize,
}

/// Progress reported while a turn runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// About to call the model
    Thinking { step: usize },
    Plan(String),
    Action { function: String, input: String },
    Observation { function: String, output: String },
    Output(String),
}

/// Receives [`AgentEvent`]s as they happen
pub trait EventSink {
    fn emit(&mut self, event: AgentEvent);
}

impl EventSink for Vec<AgentEvent> {
    fn emit(&mut self, event: AgentEvent) {
        self.push(event);
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: AgentEvent) {}
}
