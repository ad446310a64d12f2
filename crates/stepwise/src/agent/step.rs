//! Step records exchanged with the model
//!
//! The model answers every call with one JSON object declaring its current
//! step. Replies are validated here, at the boundary, into [`Step`].

use llm_core::ChatMessage;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// A validated model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Reasoning to show the user; the loop continues
    Plan { content: String },
    /// Call `function` from the registry with `input`
    Action { function: String, input: String },
    /// Final answer; the turn ends
    Output { content: String },
}

/// Why a reply could not be turned into a [`Step`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepParseError {
    #[error("reply is not a JSON step record: {0}")]
    InvalidJson(String),

    #[error("reply has no \"step\" field")]
    MissingStep,

    #[error("{step} step is missing \"{field}\"")]
    MissingField {
        step: &'static str,
        field: &'static str,
    },

    #[error("unrecognized step \"{0}\"")]
    UnknownStep(String),
}

#[derive(Debug, Deserialize)]
struct RawStep {
    step: Option<String>,
    content: Option<String>,
    function: Option<String>,
    input: Option<String>,
}

impl Step {
    /// Parse and validate a raw reply
    pub fn parse(raw: &str) -> Result<Self, StepParseError> {
        let record: RawStep =
            serde_json::from_str(raw.trim()).map_err(|e| StepParseError::InvalidJson(e.to_string()))?;

        let step = record.step.ok_or(StepParseError::MissingStep)?;
        match step.as_str() {
            "plan" => Ok(Step::Plan {
                content: record.content.ok_or(StepParseError::MissingField {
                    step: "plan",
                    field: "content",
                })?,
            }),
            "action" => {
                let function = record
                    .function
                    .filter(|f| !f.trim().is_empty())
                    .ok_or(StepParseError::MissingField {
                        step: "action",
                        field: "function",
                    })?;
                let input = record.input.ok_or(StepParseError::MissingField {
                    step: "action",
                    field: "input",
                })?;
                Ok(Step::Action {
                    function: function.trim().to_string(),
                    input,
                })
            }
            "output" => Ok(Step::Output {
                content: record.content.ok_or(StepParseError::MissingField {
                    step: "output",
                    field: "content",
                })?,
            }),
            _ => Err(StepParseError::UnknownStep(step)),
        }
    }

    /// Step name as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Plan { .. } => "plan",
            Step::Action { .. } => "action",
            Step::Output { .. } => "output",
        }
    }
}

/// Tool result fed back to the model as `{"step": "observe", "output": ...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub output: String,
}

impl Observation {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }

    /// Observations travel as user messages carrying the serialized record
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::user(json!({ "step": "observe", "output": self.output }).to_string())
    }
}
