//! Agent framework for plan/action/observe execution
//!
//! The model declares one step per reply; action steps run a registered
//! tool and the result is fed back as an observe message.

mod agent_loop;
mod prompt;
mod state;
mod step;

pub use agent_loop::{AgentLoop, TurnError};
pub use prompt::default_system_prompt;
pub use state::{AgentConfig, AgentEvent, EventSink, NullSink, Transcript, TurnOutcome};
pub use step::{Observation, Step, StepParseError};
