//! Agent loop implementation

use llm_core::{ChatMessage, ChatModel};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::tools::{SessionContext, ToolRegistry};

use super::prompt::default_system_prompt;
use super::state::{AgentConfig, AgentEvent, EventSink, Transcript, TurnOutcome};
use super::step::{Observation, Step, StepParseError};

/// Why a turn ended without an answer.
///
/// Every variant ends the current turn only; the session stays usable.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("model call failed: {:#}", .0)]
    Model(anyhow::Error),

    #[error("invalid reply from model: {0}")]
    Protocol(#[from] StepParseError),

    #[error("unknown tool \"{0}\"")]
    UnknownTool(String),

    #[error("stopped after {0} steps without an output")]
    StepLimit(usize),
}

/// The plan/action/observe loop for one session
pub struct AgentLoop {
    model: Box<dyn ChatModel>,
    registry: ToolRegistry,
    session: SessionContext,
    config: AgentConfig,
    transcript: Transcript,
}

impl AgentLoop {
    /// Create a new agent loop
    pub fn new(
        model: Box<dyn ChatModel>,
        registry: ToolRegistry,
        session: SessionContext,
        config: AgentConfig,
    ) -> Self {
        let system = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| default_system_prompt(&registry));

        info!(
            provider = model.name(),
            model = model.model(),
            tools = ?registry.list_names(),
            working_dir = %session.working_dir.display(),
            "Agent session created"
        );

        Self {
            model,
            registry,
            session,
            config,
            transcript: Transcript::new(system),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    /// Run one user query until the model emits an output step.
    ///
    /// Plan steps loop again, action steps dispatch to the registry and feed
    /// the result back as an observe message. Replies are appended to the
    /// transcript before they are validated.
    #[instrument(skip(self, query, sink), fields(model = %self.model.model()))]
    pub async fn run_turn(
        &mut self,
        query: &str,
        sink: &mut dyn EventSink,
    ) -> Result<TurnOutcome, TurnError> {
        info!(query_len = query.len(), "Starting turn");
        self.transcript.push(ChatMessage::user(query));

        let mut steps = 0;
        loop {
            if let Some(max) = self.config.max_steps {
                if steps >= max {
                    warn!(max_steps = max, "Turn reached step limit");
                    return Err(TurnError::StepLimit(max));
                }
            }
            steps += 1;

            sink.emit(AgentEvent::Thinking { step: steps });
            debug!(step = steps, messages = self.transcript.len(), "Calling model");

            let reply = match self.model.complete_json(self.transcript.messages()).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(error = %e, "Model call failed");
                    return Err(TurnError::Model(e));
                }
            };
            self.transcript.push(ChatMessage::assistant(reply.as_str()));

            let step = Step::parse(&reply).map_err(|e| {
                warn!(error = %e, "Model reply rejected");
                e
            })?;
            debug!(step = steps, kind = step.kind(), "Parsed step");

            match step {
                Step::Plan { content } => {
                    sink.emit(AgentEvent::Plan(content));
                }
                Step::Action { function, input } => {
                    sink.emit(AgentEvent::Action {
                        function: function.clone(),
                        input: input.clone(),
                    });

                    let Some(output) = self
                        .registry
                        .invoke(&function, &input, &mut self.session)
                        .await
                    else {
                        warn!(tool = %function, "Model requested unknown tool");
                        return Err(TurnError::UnknownTool(function));
                    };

                    self.transcript.push(Observation::new(output.as_str()).to_message());
                    sink.emit(AgentEvent::Observation { function, output });
                }
                Step::Output { content } => {
                    info!(steps, answer_len = content.len(), "Turn completed");
                    sink.emit(AgentEvent::Output(content.clone()));
                    return Ok(TurnOutcome {
                        answer: content,
                        steps,
                    });
                }
            }
        }
    }
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("model", &self.model.model())
            .field("registry", &self.registry)
            .field("session", &self.session)
            .field("config", &self.config)
            .field("transcript_len", &self.transcript.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::create_default_registry;
    use crate::tools::launcher::testing::RecordingLauncher;
    use crate::tools::{SecurityLevel, Tool};
    use anyhow::Result;
    use async_trait::async_trait;
    use llm_core::Role;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Replays canned replies and records every transcript it was sent
    #[derive(Clone, Default)]
    struct ScriptedModel {
        replies: Arc<Mutex<VecDeque<Result<String>>>>,
        requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Self {
            let model = Self::default();
            for reply in replies {
                model.push(Ok(reply.to_string()));
            }
            model
        }

        fn push(&self, reply: Result<String>) {
            self.replies.lock().unwrap().push_back(reply);
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, idx: usize) -> Vec<ChatMessage> {
            self.requests.lock().unwrap()[idx].clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn complete_json(&self, messages: &[ChatMessage]) -> Result<String> {
            self.requests.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
        }
    }

    /// Records each input it receives
    #[derive(Clone, Default)]
    struct EchoTool {
        inputs: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn security_level(&self) -> SecurityLevel {
            SecurityLevel::Safe
        }

        async fn execute(&self, input: &str, _ctx: &mut SessionContext) -> Result<String> {
            self.inputs.lock().unwrap().push(input.to_string());
            if input == "boom" {
                anyhow::bail!("echo refused");
            }
            Ok(format!("echo: {}", input))
        }
    }

    fn agent_with(model: &ScriptedModel, echo: &EchoTool, config: AgentConfig) -> AgentLoop {
        let mut registry = ToolRegistry::new();
        registry.register(echo.clone());
        AgentLoop::new(
            Box::new(model.clone()),
            registry,
            SessionContext::default(),
            config,
        )
    }

    fn observed_output(message: &ChatMessage) -> String {
        assert_eq!(message.role, Role::User);
        let value: serde_json::Value = serde_json::from_str(&message.content).unwrap();
        assert_eq!(value["step"], "observe");
        value["output"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_plan_action_output_turn() {
        let model = ScriptedModel::new(&[
            r#"{"step": "plan", "content": "Echo the word"}"#,
            r#"{"step": "action", "function": "echo", "input": "hello"}"#,
            r#"{"step": "output", "content": "Done: hello"}"#,
        ]);
        let echo = EchoTool::default();
        let mut agent = agent_with(&model, &echo, AgentConfig::new().with_system_prompt("rules"));
        let mut events = Vec::new();

        let outcome = agent.run_turn("say hello", &mut events).await.unwrap();
        assert_eq!(outcome.answer, "Done: hello");
        assert_eq!(outcome.steps, 3);
        assert_eq!(*echo.inputs.lock().unwrap(), vec!["hello".to_string()]);

        assert_eq!(
            events,
            vec![
                AgentEvent::Thinking { step: 1 },
                AgentEvent::Plan("Echo the word".to_string()),
                AgentEvent::Thinking { step: 2 },
                AgentEvent::Action {
                    function: "echo".to_string(),
                    input: "hello".to_string()
                },
                AgentEvent::Observation {
                    function: "echo".to_string(),
                    output: "echo: hello".to_string()
                },
                AgentEvent::Thinking { step: 3 },
                AgentEvent::Output("Done: hello".to_string()),
            ]
        );

        let messages = agent.transcript().messages();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Assistant,
                Role::User,
                Role::Assistant
            ]
        );
        assert_eq!(messages[0].content, "rules");
        assert_eq!(observed_output(&messages[4]), "echo: hello");
    }

    #[tokio::test]
    async fn test_model_receives_full_transcript_each_call() {
        let model = ScriptedModel::new(&[
            r#"{"step": "plan", "content": "thinking"}"#,
            r#"{"step": "action", "function": "echo", "input": "x"}"#,
            r#"{"step": "output", "content": "ok"}"#,
        ]);
        let mut agent = agent_with(&model, &EchoTool::default(), AgentConfig::new());

        agent.run_turn("go", &mut Vec::new()).await.unwrap();

        assert_eq!(model.calls(), 3);
        assert_eq!(model.request(0).len(), 2);
        assert_eq!(model.request(1).len(), 3);
        assert_eq!(model.request(2).len(), 5);
        assert_eq!(model.request(2), agent.transcript().messages()[..5].to_vec());
    }

    #[tokio::test]
    async fn test_output_ends_turn_without_more_calls() {
        let model = ScriptedModel::new(&[
            r#"{"step": "output", "content": "42"}"#,
            r#"{"step": "plan", "content": "never read"}"#,
        ]);
        let mut agent = agent_with(&model, &EchoTool::default(), AgentConfig::new());

        let outcome = agent.run_turn("answer?", &mut Vec::new()).await.unwrap();
        assert_eq!(outcome.answer, "42");
        assert_eq!(model.calls(), 1);
        assert_eq!(agent.transcript().len(), 3);
        assert_eq!(agent.transcript().last().unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_tool_error_is_observed_not_fatal() {
        let model = ScriptedModel::new(&[
            r#"{"step": "action", "function": "echo", "input": "boom"}"#,
            r#"{"step": "output", "content": "The tool failed"}"#,
        ]);
        let mut agent = agent_with(&model, &EchoTool::default(), AgentConfig::new());

        let outcome = agent.run_turn("try", &mut Vec::new()).await.unwrap();
        assert_eq!(outcome.answer, "The tool failed");
        assert_eq!(
            observed_output(&agent.transcript().messages()[3]),
            "Error: echo refused"
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_ends_turn_without_observation() {
        let model = ScriptedModel::new(&[
            r#"{"step": "action", "function": "launch_rocket", "input": "now"}"#,
            r#"{"step": "output", "content": "never read"}"#,
        ]);
        let mut agent = agent_with(&model, &EchoTool::default(), AgentConfig::new());
        let mut events = Vec::new();

        let err = agent.run_turn("go", &mut events).await.unwrap_err();
        assert!(matches!(err, TurnError::UnknownTool(ref name) if name == "launch_rocket"));
        assert_eq!(model.calls(), 1);
        assert_eq!(agent.transcript().len(), 3);
        assert_eq!(agent.transcript().last().unwrap().role, Role::Assistant);
        assert!(!events
            .iter()
            .any(|e| matches!(e, AgentEvent::Observation { .. })));
    }

    #[tokio::test]
    async fn test_invalid_reply_is_protocol_error() {
        let model = ScriptedModel::new(&["not json at all"]);
        let mut agent = agent_with(&model, &EchoTool::default(), AgentConfig::new());

        let err = agent.run_turn("go", &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err, TurnError::Protocol(StepParseError::InvalidJson(_))));
        // The raw reply is still recorded
        assert_eq!(agent.transcript().last().unwrap().content, "not json at all");
    }

    #[tokio::test]
    async fn test_unrecognized_step_is_protocol_error() {
        let model = ScriptedModel::new(&[r#"{"step": "observe", "output": "hmm"}"#]);
        let mut agent = agent_with(&model, &EchoTool::default(), AgentConfig::new());

        let err = agent.run_turn("go", &mut Vec::new()).await.unwrap_err();
        assert!(matches!(
            err,
            TurnError::Protocol(StepParseError::UnknownStep(ref s)) if s == "observe"
        ));
        assert!(err.to_string().contains("unrecognized step"));
    }

    #[tokio::test]
    async fn test_model_failure_ends_turn() {
        let model = ScriptedModel::default();
        model.push(Err(anyhow::anyhow!("connection reset")));
        let mut agent = agent_with(&model, &EchoTool::default(), AgentConfig::new());

        let err = agent.run_turn("go", &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err, TurnError::Model(_)));
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(agent.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_step_limit_guard() {
        let model = ScriptedModel::new(&[
            r#"{"step": "plan", "content": "1"}"#,
            r#"{"step": "plan", "content": "2"}"#,
            r#"{"step": "plan", "content": "3"}"#,
            r#"{"step": "plan", "content": "4"}"#,
        ]);
        let mut agent = agent_with(
            &model,
            &EchoTool::default(),
            AgentConfig::new().with_max_steps(Some(3)),
        );

        let err = agent.run_turn("loop", &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err, TurnError::StepLimit(3)));
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_session_recovers_after_failed_turn() {
        let model = ScriptedModel::new(&[
            r#"{"step": "action", "function": "missing", "input": ""}"#,
            r#"{"step": "output", "content": "second answer"}"#,
        ]);
        let mut agent = agent_with(&model, &EchoTool::default(), AgentConfig::new());

        assert!(agent.run_turn("first", &mut Vec::new()).await.is_err());
        let outcome = agent.run_turn("second", &mut Vec::new()).await.unwrap();
        assert_eq!(outcome.answer, "second answer");

        // Append-only: the failed turn stays in the transcript
        let contents: Vec<&str> = agent
            .transcript()
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents[1], "first");
        assert_eq!(contents[3], "second");
        assert_eq!(agent.transcript().len(), 5);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_change_dir_persists_across_turns() {
        let start = TempDir::new().unwrap();
        let site = TempDir::new().unwrap();
        std::fs::write(site.path().join("index.html"), "<p>hi</p>").unwrap();
        let launcher = Arc::new(RecordingLauncher::default());

        let change = format!(
            r#"{{"step": "action", "function": "run_command", "input": "change_dir:{}"}}"#,
            site.path().display()
        );
        let model = ScriptedModel::new(&[
            change.as_str(),
            r#"{"step": "output", "content": "moved"}"#,
            r#"{"step": "action", "function": "run_command", "input": "open_in_browser:index.html"}"#,
            r#"{"step": "output", "content": "opened"}"#,
        ]);
        let session = SessionContext::new(start.path().to_path_buf()).with_launcher(launcher.clone());
        let mut agent = AgentLoop::new(
            Box::new(model.clone()),
            create_default_registry(),
            session,
            AgentConfig::new(),
        );

        agent.run_turn("cd", &mut Vec::new()).await.unwrap();
        agent.run_turn("open it", &mut Vec::new()).await.unwrap();

        let canonical_site = site.path().canonicalize().unwrap();
        assert_eq!(agent.session().working_dir, canonical_site);
        assert_eq!(
            launcher.opened(),
            vec![format!("file://{}", canonical_site.join("index.html").display())]
        );
    }

    #[test]
    fn test_default_prompt_used_without_override() {
        let model = ScriptedModel::default();
        let agent = AgentLoop::new(
            Box::new(model),
            create_default_registry(),
            SessionContext::default(),
            AgentConfig::new(),
        );
        let system = &agent.transcript().messages()[0];
        assert_eq!(system.role, Role::System);
        assert!(system.content.contains("run_command"));
    }
}
