//! Agent runner with the bounded tool-calling loop.

use super::catalog::ToolRegistry;
use super::model::{collect_text, LanguageModel};
use super::parse::{parse_action, Action};
use super::retry::{retry, RetryError, RetryPolicy};
use crate::config::{Prompts, Settings};
use crate::engine::json::truncate_chars;
use crate::error::{FeedscopeError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

const DEFAULT_MAX_ITERATIONS: usize = 3;
const DEFAULT_HISTORY_RESULT_CHARS: usize = 500;

/// One executed tool call in a run's log.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IterationRecord {
    /// 1-based.
    pub iteration: usize,
    pub tool: String,
    pub parameters: Value,
    pub result: Value,
}

/// How a run ended.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    Answered { final_answer: String },
    Exhausted { final_answer: String },
    Failed { error: String, iteration: usize },
}

impl RunOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            RunOutcome::Answered { .. } => "answered",
            RunOutcome::Exhausted { .. } => "exhausted",
            RunOutcome::Failed { .. } => "failed",
        }
    }
}

/// Result of a single agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub id: Uuid,
    pub query: String,
    #[serde(flatten)]
    pub outcome: RunOutcome,
    pub iterations: Vec<IterationRecord>,
    /// Loop iterations started; model retries within an iteration are not counted.
    pub total_iterations: usize,
}

impl AgentRun {
    pub fn final_answer(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Answered { final_answer } | RunOutcome::Exhausted { final_answer } => {
                Some(final_answer)
            }
            RunOutcome::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, RunOutcome::Failed { .. })
    }
}

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Status { message: String, iteration: usize },
    ToolCall { iteration: usize, tool: String, parameters: Value },
    ToolResult { iteration: usize, tool: String, result: Value },
    Content { content: String },
    Done { status: String, total_iterations: usize },
    Error { message: String },
}

/// LLM agent that answers questions by calling data tools.
pub struct Agent {
    model: Arc<dyn LanguageModel>,
    registry: Arc<ToolRegistry>,
    prompts: Prompts,
    max_iterations: usize,
    history_result_chars: usize,
    model_retry: RetryPolicy,
    streaming: bool,
}

impl Agent {
    /// Create an agent with default prompts and limits.
    pub fn new(model: Arc<dyn LanguageModel>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            registry,
            prompts: Prompts::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history_result_chars: DEFAULT_HISTORY_RESULT_CHARS,
            model_retry: RetryPolicy::new(2, Duration::from_secs(2)),
            streaming: false,
        }
    }

    /// Create an agent configured from settings, loading custom prompts if any.
    pub fn from_settings(
        settings: &Settings,
        model: Arc<dyn LanguageModel>,
        registry: Arc<ToolRegistry>,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Ok(Self::new(model, registry)
            .with_prompts(prompts)
            .with_max_iterations(settings.agent.max_iterations)
            .with_history_result_chars(settings.agent.history_result_chars)
            .with_model_retry(RetryPolicy::from(&settings.agent.model_retry))
            .with_streaming(settings.model.streaming))
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_history_result_chars(mut self, chars: usize) -> Self {
        self.history_result_chars = chars;
        self
    }

    pub fn with_model_retry(mut self, policy: RetryPolicy) -> Self {
        self.model_retry = policy;
        self
    }

    /// Read model replies as a chunk stream instead of one blocking call.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run the agent to completion without progress events.
    pub async fn run(&self, query: &str, context: Option<&Value>) -> AgentRun {
        self.run_with_events(query, context, None, &CancellationToken::new())
            .await
    }

    /// Run the agent, reporting progress on `events`.
    ///
    /// A closed receiver does not affect the run. `cancel` is checked before
    /// each iteration and interrupts backoff sleeps.
    pub async fn run_with_events(
        &self,
        query: &str,
        context: Option<&Value>,
        events: Option<&UnboundedSender<AgentEvent>>,
        cancel: &CancellationToken,
    ) -> AgentRun {
        let id = Uuid::new_v4();
        let span = info_span!("agent_run", run_id = %id);

        async {
            info!("Agent run started: {}", query);
            let mut run = AgentRun {
                id,
                query: query.to_string(),
                outcome: RunOutcome::Failed {
                    error: "Run did not start".to_string(),
                    iteration: 0,
                },
                iterations: Vec::new(),
                total_iterations: 0,
            };

            run.outcome = self.drive(&mut run, context, events, cancel).await;

            match &run.outcome {
                RunOutcome::Failed { error, .. } => {
                    warn!("Agent run failed: {}", error);
                    emit(events, AgentEvent::Error { message: error.clone() });
                }
                RunOutcome::Answered { final_answer } | RunOutcome::Exhausted { final_answer } => {
                    emit(events, AgentEvent::Content { content: final_answer.clone() });
                }
            }
            info!(
                "Agent run {} after {} model call(s)",
                run.outcome.status(),
                run.total_iterations
            );
            emit(
                events,
                AgentEvent::Done {
                    status: run.outcome.status().to_string(),
                    total_iterations: run.total_iterations,
                },
            );
            run
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        run: &mut AgentRun,
        context: Option<&Value>,
        events: Option<&UnboundedSender<AgentEvent>>,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        for i in 0..self.max_iterations {
            let iteration = i + 1;
            if cancel.is_cancelled() {
                return cancelled(iteration);
            }

            emit(
                events,
                AgentEvent::Status {
                    message: format!("Thinking (iteration {}/{})", iteration, self.max_iterations),
                    iteration,
                },
            );

            let prompt = self.build_prompt(&run.query, context, &run.iterations, iteration);
            run.total_iterations += 1;

            let text = match self.call_model(&prompt, cancel).await {
                Ok(text) => text,
                Err(RetryError::Cancelled) => return cancelled(iteration),
                Err(RetryError::Exhausted(e)) => {
                    return RunOutcome::Failed {
                        error: e.to_string(),
                        iteration,
                    }
                }
            };

            match parse_action(&text) {
                Action::Answer(answer) => {
                    return RunOutcome::Answered { final_answer: answer };
                }
                Action::Unstructured(raw) => {
                    warn!("Model reply had no usable action; using it as the answer");
                    return RunOutcome::Answered { final_answer: raw };
                }
                Action::UseTool { tool, parameters } => {
                    let tool_name = match &tool {
                        Value::String(s) => s.clone(),
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    info!("Iteration {}: calling tool {}", iteration, tool_name);
                    emit(
                        events,
                        AgentEvent::ToolCall {
                            iteration,
                            tool: tool_name.clone(),
                            parameters: parameters.clone(),
                        },
                    );

                    let result = self.registry.dispatch(&tool, &parameters, cancel).await;

                    emit(
                        events,
                        AgentEvent::ToolResult {
                            iteration,
                            tool: tool_name.clone(),
                            result: result.clone(),
                        },
                    );
                    run.iterations.push(IterationRecord {
                        iteration,
                        tool: tool_name,
                        parameters,
                        result,
                    });
                }
            }
        }

        let log = serde_json::to_string_pretty(&run.iterations).unwrap_or_default();
        RunOutcome::Exhausted {
            final_answer: format!("Maximum iterations reached. Here's what I found:\n{}", log),
        }
    }

    async fn call_model(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, RetryError<FeedscopeError>> {
        let model = &self.model;
        let streaming = self.streaming;

        retry(self.model_retry, cancel, "Model call", move |attempt| async move {
            debug!("Model call attempt {} ({} chars)", attempt, prompt.len());
            let text = if streaming {
                collect_text(model.stream(prompt).await?).await?
            } else {
                model.complete(prompt).await?
            };

            if text.trim().is_empty() {
                Err(FeedscopeError::Model("Empty response from model".to_string()))
            } else {
                Ok(text)
            }
        })
        .await
    }

    fn build_prompt(
        &self,
        query: &str,
        context: Option<&Value>,
        history: &[IterationRecord],
        iteration: usize,
    ) -> String {
        let context_text = context
            .and_then(|c| serde_json::to_string_pretty(c).ok())
            .unwrap_or_else(|| "{}".to_string());

        let mut vars = HashMap::new();
        vars.insert("tools".to_string(), self.registry.catalog_text());
        vars.insert("max_iterations".to_string(), self.max_iterations.to_string());
        vars.insert("context".to_string(), context_text);
        vars.insert("query".to_string(), query.to_string());
        vars.insert("history".to_string(), self.history_text(history));
        vars.insert("iteration".to_string(), iteration.to_string());

        let agent = &self.prompts.agent;
        let turn = if history.is_empty() {
            &agent.first_turn
        } else {
            &agent.next_turn
        };

        format!(
            "{}\n\n{}",
            self.prompts.render_with_custom(&agent.system, &vars),
            self.prompts.render_with_custom(turn, &vars)
        )
    }

    fn history_text(&self, history: &[IterationRecord]) -> String {
        history
            .iter()
            .map(|record| {
                let result = truncate_chars(&record.result.to_string(), self.history_result_chars);
                format!(
                    "Iteration {}: Used tool '{}' with parameters {}\nResult: {}",
                    record.iteration, record.tool, record.parameters, result
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn cancelled(iteration: usize) -> RunOutcome {
    RunOutcome::Failed {
        error: "Run cancelled".to_string(),
        iteration,
    }
}

fn emit(events: Option<&UnboundedSender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = events {
        // receiver may be gone; the run carries on regardless
        let _ = tx.send(event);
    }
}
