//! Agent command implementation.

use crate::agent::{Agent, OpenAIModel, RunOutcome, ToolRegistry};
use crate::cli::Output;
use crate::config::Settings;
use crate::openai::require_api_key;
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Options for a single agent run from the command line.
#[derive(Debug, Default)]
pub struct AgentOptions {
    pub context: Option<String>,
    pub context_file: Option<String>,
    pub max_iterations: Option<usize>,
    pub model: Option<String>,
    pub stream: bool,
    pub json: bool,
}

/// Run the agent command.
pub async fn run_agent(query: &str, options: AgentOptions, mut settings: Settings) -> Result<()> {
    if let Err(e) = require_api_key() {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    if let Some(model) = options.model {
        settings.model.name = model;
    }
    if let Some(max) = options.max_iterations {
        settings.agent.max_iterations = max;
    }
    if options.stream {
        settings.model.streaming = true;
    }

    let context = load_context(options.context.as_deref(), options.context_file.as_deref())?;

    let model = Arc::new(OpenAIModel::from_settings(&settings.model)?);
    let registry = Arc::new(ToolRegistry::from_settings(&settings));
    let agent = Agent::from_settings(&settings, model, registry)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let spinner = Output::spinner("Agent thinking...");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let progress = spinner.clone();
    let reporter = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = Output::event_line(&event) {
                debug!("{}", line);
                progress.set_message(line);
            }
        }
    });

    let run = agent
        .run_with_events(query, context.as_ref(), Some(&tx), &cancel)
        .await;
    drop(tx);
    let _ = reporter.await;
    spinner.finish_and_clear();

    if options.json {
        Output::json(&serde_json::to_value(&run)?);
        return match run.outcome {
            RunOutcome::Failed { error, .. } => Err(anyhow::anyhow!(error)),
            _ => Ok(()),
        };
    }

    match &run.outcome {
        RunOutcome::Answered { final_answer } => {
            println!("\n{}\n", final_answer);
        }
        RunOutcome::Exhausted { final_answer } => {
            Output::warning("The agent ran out of iterations before answering.");
            println!("\n{}\n", final_answer);
        }
        RunOutcome::Failed { error, iteration } => {
            Output::error(&format!("Agent failed on iteration {}: {}", iteration, error));
            return Err(anyhow::anyhow!(error.clone()));
        }
    }

    if !run.iterations.is_empty() {
        Output::header(&format!("Tool calls ({})", run.iterations.len()));
        for record in &run.iterations {
            let status = if record.result.get("error").is_some() { "error" } else { "ok" };
            Output::list_item(&format!("{} [{}]", record.tool, status));
        }
        println!();
    }

    Output::info(&format!(
        "Completed in {} model call(s) (run {})",
        run.total_iterations, run.id
    ));

    Ok(())
}

/// Parse `--context` or `--context-file` into a JSON value.
fn load_context(inline: Option<&str>, file: Option<&str>) -> Result<Option<Value>> {
    if let Some(text) = inline {
        let value = serde_json::from_str(text).context("--context is not valid JSON")?;
        return Ok(Some(value));
    }

    if let Some(path) = file {
        let path = Settings::expand_path(path);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read context file {}", path.display()))?;
        let value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        return Ok(Some(value));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_inline_context() {
        let ctx = load_context(Some(r#"{"creator": "ana"}"#), None).unwrap();
        assert_eq!(ctx, Some(json!({"creator": "ana"})));
        assert!(load_context(Some("{nope"), None).is_err());
        assert_eq!(load_context(None, None).unwrap(), None);
    }

    #[test]
    fn test_load_context_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.json");
        std::fs::write(&path, r#"{"focus": "reels"}"#).unwrap();

        let ctx = load_context(None, path.to_str()).unwrap();
        assert_eq!(ctx, Some(json!({"focus": "reels"})));
    }
}
