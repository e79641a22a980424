//! Core agent execution loop.
//!
//! Strictly sequential: one model query, then at most one tool call, whose
//! observation is recorded before the next query.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use navigator_config::WorkflowConfig;
use navigator_core::{
    find_url, loose_json, AgentStep, ErrorKind, NavigatorError, Observation, Result, ToolInput,
    ToolRegistry, Turn,
};
use navigator_llm::LlmClient;
use navigator_logging::{AgentEvent, EventLogger};

use crate::history::ConversationHistory;
use crate::response_parser::{parse_response, strip_invented_observation, ParsedResponse};
use crate::system_prompt::{PromptBuilder, DEFAULT_SYSTEM_PROMPT};
use crate::tool_dispatcher::{failed, ToolDispatcher};

/// Stop sequence sent with every model query.
const OBSERVATION_STOP: &str = "\nObservation:";

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub max_iterations: usize,
    pub max_history: usize,
    pub max_retries: usize,
    pub stopping_condition: String,
    /// Template rendered by [`PromptBuilder`].
    pub system_prompt: String,
    pub max_observation_chars: usize,
    /// Base delay between model retries; grows linearly per attempt.
    pub retry_backoff: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_workflow(&WorkflowConfig::default())
    }
}

impl AgentSettings {
    pub fn from_workflow(workflow: &WorkflowConfig) -> Self {
        Self {
            max_iterations: workflow.max_iterations(),
            max_history: workflow.max_history(),
            max_retries: workflow.max_retries(),
            stopping_condition: workflow.stopping_condition().to_string(),
            system_prompt: workflow
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_observation_chars: workflow.max_observation_chars(),
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Everything one run needs. Nothing here is shared with other runs except
/// what the caller chooses to clone in.
pub struct RunContext {
    pub registry: Arc<ToolRegistry>,
    pub llm: LlmClient,
    pub settings: AgentSettings,
    pub cancel: CancellationToken,
    pub session_id: String,
}

impl RunContext {
    pub fn new(registry: Arc<ToolRegistry>, llm: LlmClient, settings: AgentSettings) -> Self {
        Self {
            registry,
            llm,
            settings,
            cancel: CancellationToken::new(),
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Successful end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub session_id: String,
    pub final_answer: String,
    pub steps: Vec<AgentStep>,
    pub iterations: usize,
}

/// What the model asked for on one iteration.
enum Decision {
    Final {
        thought: String,
        answer: String,
    },
    Call {
        thought: String,
        action: String,
        raw_input: String,
        resolved: Result<ToolInput>,
    },
    Malformed(NavigatorError),
}

/// The core agent runner that manages the conversation loop.
pub struct AgentRunner {
    ctx: RunContext,
    dispatcher: ToolDispatcher,
}

impl AgentRunner {
    pub fn new(ctx: RunContext) -> Self {
        let dispatcher = ToolDispatcher::new(ctx.settings.max_retries);
        Self { ctx, dispatcher }
    }

    pub fn session_id(&self) -> &str {
        &self.ctx.session_id
    }

    /// Run the agent loop until it produces a final answer or a fatal error.
    #[instrument(skip(self, task), fields(session_id = %self.ctx.session_id))]
    pub async fn run(&self, task: &str) -> Result<RunOutcome> {
        let mut iterations = 0;
        let result = self.run_loop(task, &mut iterations).await;
        match &result {
            Ok(outcome) => {
                info!(iterations = outcome.iterations, "Agent produced final answer");
            }
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "Agent run failed");
                self.event(AgentEvent::Error {
                    iteration: iterations,
                    kind: e.kind().as_str().to_string(),
                    error_msg: e.to_string(),
                });
            }
        }
        self.event(AgentEvent::RunFinished {
            iterations,
            success: result.is_ok(),
        });
        result
    }

    async fn run_loop(&self, task: &str, iterations: &mut usize) -> Result<RunOutcome> {
        let settings = &self.ctx.settings;
        if find_url(task).is_none() {
            return Err(NavigatorError::InvalidUrl {
                url: task.trim().to_string(),
                reason: "the task must mention an http(s) URL".into(),
            });
        }
        if self.ctx.registry.is_empty() {
            return Err(NavigatorError::Config("no tools are registered".into()));
        }

        let system = PromptBuilder::build(
            &settings.system_prompt,
            &self.ctx.registry,
            &settings.stopping_condition,
        );
        let mut history = ConversationHistory::new(system, settings.max_history);
        history.push(Turn::user(format!("Question: {}", task.trim())));
        let mut steps: Vec<AgentStep> = Vec::new();

        info!(tools = self.ctx.registry.len(), max_iterations = settings.max_iterations, "Starting agent loop");

        for iteration in 1..=settings.max_iterations {
            *iterations = iteration;
            self.check_cancelled()?;
            debug!(
                iteration,
                history = history.turn_count(),
                dropped = history.dropped(),
                "Agent loop step"
            );

            let (output, decision) = self.decide(&history, iteration).await?;
            history.push(Turn::assistant(output));

            let (thought, action, action_input, observation) = match decision {
                Decision::Final { thought, answer } => {
                    steps.push(AgentStep {
                        index: iteration,
                        thought,
                        action: None,
                        action_input: None,
                        observation: Observation::Final {
                            answer: answer.clone(),
                        },
                    });
                    return Ok(RunOutcome {
                        session_id: self.ctx.session_id.clone(),
                        final_answer: answer,
                        steps,
                        iterations: iteration,
                    });
                }
                Decision::Malformed(error) => (String::new(), None, None, failed(&error)),
                Decision::Call {
                    thought,
                    action,
                    raw_input,
                    resolved,
                } => {
                    let (input_value, observation) =
                        self.call_tool(iteration, &action, &raw_input, resolved).await?;
                    (thought, Some(action), Some(input_value), observation)
                }
            };

            let rendered = clip_observation(&observation.render(), settings.max_observation_chars);
            self.event(AgentEvent::Observation {
                iteration,
                tool_name: action.clone().unwrap_or_default(),
                is_error: observation.is_error(),
                content: rendered.clone(),
            });
            history.push(Turn::user(format!("Observation: {rendered}")));

            steps.push(AgentStep {
                index: iteration,
                thought,
                action,
                action_input,
                observation,
            });
        }

        Err(NavigatorError::IterationLimitExceeded(settings.max_iterations))
    }

    /// Queries the model until its reply parses and names a usable input,
    /// re-asking with a format reminder up to `max_retries` times.
    async fn decide(
        &self,
        history: &ConversationHistory,
        iteration: usize,
    ) -> Result<(String, Decision)> {
        let settings = &self.ctx.settings;
        let mut reminder: Option<(String, String)> = None;
        let mut attempt = 0;

        loop {
            let mut messages = history.messages();
            if let Some((bad_output, problem)) = &reminder {
                messages.push(Turn::assistant(bad_output.clone()));
                messages.push(Turn::user(PromptBuilder::format_reminder(problem)));
            }

            let raw = self.complete(history.system_prompt(), messages).await?;
            let output = strip_invented_observation(&raw).to_string();
            self.event(AgentEvent::ModelOutput {
                iteration,
                content: output.clone(),
            });

            let decision = match parse_response(&output, &settings.stopping_condition) {
                Ok(ParsedResponse::Final { thought, answer }) => Ok(Decision::Final { thought, answer }),
                Ok(ParsedResponse::Action {
                    thought,
                    action,
                    action_input,
                }) => {
                    let resolved = self
                        .ctx
                        .registry
                        .resolve(&action, &action_input)
                        .map(|(_, input)| input);
                    match resolved {
                        Err(e) if e.kind() == ErrorKind::ParseError => Err(e),
                        resolved => Ok(Decision::Call {
                            thought,
                            action,
                            raw_input: action_input,
                            resolved,
                        }),
                    }
                }
                Err(e) => Err(e),
            };

            match decision {
                Ok(decision) => return Ok((output, decision)),
                Err(error) if attempt < settings.max_retries => {
                    attempt += 1;
                    warn!(iteration, attempt, error = %error, "Unusable model reply, asking again");
                    self.event(AgentEvent::Error {
                        iteration,
                        kind: error.kind().as_str().to_string(),
                        error_msg: error.to_string(),
                    });
                    reminder = Some((output, error.to_string()));
                }
                Err(error) => return Ok((output, Decision::Malformed(error))),
            }
        }
    }

    async fn call_tool(
        &self,
        iteration: usize,
        action: &str,
        raw_input: &str,
        resolved: Result<ToolInput>,
    ) -> Result<(Value, Observation)> {
        let input_value = match &resolved {
            Ok(input) => input.to_value(),
            Err(_) => loose_json(raw_input).unwrap_or_else(|| Value::String(raw_input.to_string())),
        };
        self.event(AgentEvent::ToolCall {
            iteration,
            tool_name: action.to_string(),
            arguments_json: input_value.to_string(),
        });

        let observation = match (resolved, self.ctx.registry.get(action)) {
            (Ok(input), Some(spec)) => {
                let result = self.dispatcher.execute(spec, input, &self.ctx.cancel).await?;
                if result.attempts > 1 {
                    debug!(tool = %spec.name, attempts = result.attempts, "Tool needed retries");
                }
                result.observation
            }
            (Ok(_), None) => failed(&NavigatorError::UnknownTool(action.to_string())),
            (Err(error), _) => failed(&error),
        };
        Ok((input_value, observation))
    }

    async fn complete(&self, system_prompt: &str, messages: Vec<Turn>) -> Result<String> {
        let settings = &self.ctx.settings;
        let stop = vec![OBSERVATION_STOP.to_string()];
        let mut last_error = String::new();

        for attempt in 0..=settings.max_retries {
            if attempt > 0 && !settings.retry_backoff.is_zero() {
                tokio::select! {
                    _ = self.ctx.cancel.cancelled() => return Err(NavigatorError::Cancelled),
                    _ = tokio::time::sleep(settings.retry_backoff * attempt as u32) => {}
                }
            }
            self.check_cancelled()?;

            let reply = tokio::select! {
                _ = self.ctx.cancel.cancelled() => return Err(NavigatorError::Cancelled),
                reply = self.ctx.llm.chat(system_prompt, messages.clone(), stop.clone()) => reply,
            };
            match reply {
                Ok(response) => return Ok(response.content),
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "Model query failed");
                    last_error = format!("{e:#}");
                }
            }
        }

        Err(NavigatorError::LlmFailure {
            provider: self.ctx.llm.provider_name().to_string(),
            message: last_error,
        })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.ctx.cancel.is_cancelled() {
            return Err(NavigatorError::Cancelled);
        }
        Ok(())
    }

    fn event(&self, event: AgentEvent) {
        EventLogger::log_event(&self.ctx.session_id, event);
    }
}

/// Keeps the first `max_chars` characters and notes how many were cut.
fn clip_observation(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max_chars).collect();
    clipped.push_str(&format!("\n[truncated {} characters]", total - max_chars));
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use navigator_core::{PlanArtifact, Tool, ToolKind, ToolOutput, ToolSpec};
    use navigator_llm::{MockProvider, MockReply};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TASK: &str = "Create tests for https://example.com/";
    const NAVIGATE: &str =
        "Thought: open the site\nAction: web_navigator\nAction Input: https://example.com/";
    const FINISH: &str = "Thought: I now know the final answer\nFinal Answer: tests written";

    /// Stand-in navigator: fails `failures` times with a network error, then succeeds.
    struct StubNavigator {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for StubNavigator {
        fn kind(&self) -> ToolKind {
            ToolKind::WebNavigator
        }

        async fn invoke(&self, _input: ToolInput) -> Result<ToolOutput> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(NavigatorError::NetworkFailure {
                    url: "https://example.com/".into(),
                    message: "connection reset".into(),
                });
            }
            Ok(ToolOutput::Plan(PlanArtifact {
                file_path: "output/x.md".into(),
                test_case_count: 1,
            }))
        }
    }

    fn settings() -> AgentSettings {
        AgentSettings {
            max_iterations: 5,
            max_history: 30,
            max_retries: 2,
            retry_backoff: Duration::ZERO,
            ..AgentSettings::default()
        }
    }

    fn runner(mock: Arc<MockProvider>, failures: usize, settings: AgentSettings) -> (AgentRunner, Arc<StubNavigator>) {
        let tool = Arc::new(StubNavigator {
            failures,
            calls: AtomicUsize::new(0),
        });
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolSpec::new("web_navigator", "Opens a page.", tool.clone()))
            .unwrap();
        let ctx = RunContext::new(Arc::new(registry), LlmClient::new(mock, "gpt-4o"), settings);
        (AgentRunner::new(ctx), tool)
    }

    #[tokio::test]
    async fn stops_on_final_answer() {
        let mock = Arc::new(MockProvider::new("mock").with_script([NAVIGATE, FINISH]));
        let (runner, tool) = runner(mock.clone(), 0, settings());

        let outcome = runner.run(TASK).await.unwrap();
        assert_eq!(outcome.final_answer, "tests written");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.steps.len(), 2);
        assert_eq!(outcome.steps[0].action.as_deref(), Some("web_navigator"));
        assert_eq!(
            outcome.steps[0].action_input,
            Some(serde_json::json!({ "url": "https://example.com/" }))
        );
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);

        // The second query sees the observation of the first tool call.
        let second = &mock.requests()[1];
        assert!(second.messages.last().unwrap().content.starts_with("Observation: "));
        assert!(second.system_prompt.contains("web_navigator: Opens a page.\n  Input schema: "));
        assert!(second.system_prompt.contains(r#""required":["url"]"#));
        assert_eq!(second.stop, vec![OBSERVATION_STOP.to_string()]);
    }

    #[tokio::test]
    async fn task_without_url_is_rejected() {
        let mock = Arc::new(MockProvider::new("mock").with_response(FINISH));
        let (runner, _) = runner(mock.clone(), 0, settings());
        let err = runner.run("write some tests please").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn iteration_limit_is_fatal_and_history_stays_bounded() {
        let mock = Arc::new(MockProvider::new("mock").with_response(NAVIGATE));
        let (runner, tool) = runner(
            mock.clone(),
            0,
            AgentSettings {
                max_iterations: 6,
                max_history: 5,
                ..settings()
            },
        );

        let err = runner.run(TASK).await.unwrap_err();
        assert!(matches!(err, NavigatorError::IterationLimitExceeded(6)));
        assert_eq!(tool.calls.load(Ordering::SeqCst), 6);
        assert_eq!(mock.calls(), 6);
        for request in mock.requests() {
            // System prompt travels separately; it is the pinned extra turn.
            assert!(request.messages.len() + 1 <= 5);
        }
    }

    #[tokio::test]
    async fn exhausted_tool_retries_are_observed_and_loop_continues() {
        let mock = Arc::new(MockProvider::new("mock").with_script([NAVIGATE, FINISH]));
        let (runner, tool) = runner(mock, usize::MAX, settings());

        let outcome = runner.run(TASK).await.unwrap();
        assert_eq!(tool.calls.load(Ordering::SeqCst), 3);
        let Observation::Error { error } = &outcome.steps[0].observation else {
            panic!("expected an error observation");
        };
        assert_eq!(error.kind, ErrorKind::ToolInvocationFailed);
        assert_eq!(outcome.final_answer, "tests written");
    }

    #[tokio::test]
    async fn unknown_tool_is_an_observation() {
        let mock = Arc::new(MockProvider::new("mock").with_script([
            "Thought: run it\nAction: cypress_runner\nAction Input: {}",
            FINISH,
        ]));
        let (runner, tool) = runner(mock.clone(), 0, settings());

        let outcome = runner.run(TASK).await.unwrap();
        let Observation::Error { error } = &outcome.steps[0].observation else {
            panic!("expected an error observation");
        };
        assert_eq!(error.kind, ErrorKind::UnknownTool);
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
        // Structural errors are not retried against the model.
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn malformed_reply_is_retried_with_ephemeral_reminder() {
        let mock = Arc::new(MockProvider::new("mock").with_script([
            "I will look at the page now.",
            NAVIGATE,
            FINISH,
        ]));
        let (runner, _) = runner(mock.clone(), 0, settings());

        let outcome = runner.run(TASK).await.unwrap();
        assert_eq!(outcome.iterations, 2);
        assert!(!outcome.steps[0].observation.is_error());

        let requests = mock.requests();
        let retry = &requests[1];
        assert!(retry.messages.last().unwrap().content.contains("could not be used"));
        let after = &requests[2];
        assert!(after.messages.iter().all(|t| !t.content.contains("could not be used")));
        assert!(after.messages.iter().all(|t| t.content != "I will look at the page now."));
    }

    #[tokio::test]
    async fn parse_error_after_retries_becomes_observation() {
        let mock = Arc::new(MockProvider::new("mock").with_script([
            "Thought: go\nAction: web_navigator",
            FINISH,
        ]));
        let (runner, _) = runner(mock, 0, AgentSettings { max_retries: 0, ..settings() });

        let outcome = runner.run(TASK).await.unwrap();
        assert_eq!(outcome.iterations, 2);
        let Observation::Error { error } = &outcome.steps[0].observation else {
            panic!("expected an error observation");
        };
        assert_eq!(error.kind, ErrorKind::ParseError);
    }

    #[tokio::test]
    async fn model_failure_is_fatal_after_retries() {
        let mock = Arc::new(MockProvider::new("mock").with_replies([
            MockReply::Fail("503".into()),
            MockReply::Fail("503".into()),
            MockReply::Fail("503".into()),
        ]));
        let (runner, _) = runner(mock.clone(), 0, settings());

        let err = runner.run(TASK).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LlmFailure);
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn cancelled_run_makes_no_model_call() {
        let mock = Arc::new(MockProvider::new("mock").with_response(FINISH));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let tool = Arc::new(StubNavigator { failures: 0, calls: AtomicUsize::new(0) });
        let mut registry = ToolRegistry::new();
        registry.register(ToolSpec::new("web_navigator", "Opens a page.", tool)).unwrap();
        let ctx = RunContext::new(Arc::new(registry), LlmClient::new(mock.clone(), "m"), settings())
            .with_cancel(cancel);

        let err = AgentRunner::new(ctx).run(TASK).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn long_observations_are_clipped() {
        let clipped = clip_observation(&"x".repeat(50), 10);
        assert_eq!(clipped, format!("{}\n[truncated 40 characters]", "x".repeat(10)));
        assert_eq!(clip_observation("short", 10), "short");
    }
}
