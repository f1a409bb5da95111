//! Tools and exec command implementations.

use crate::agent::ToolRegistry;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::{Context, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// List the tool catalog.
pub fn run_tools(json: bool, settings: Settings) -> Result<()> {
    let registry = ToolRegistry::from_settings(&settings);

    if json {
        let descriptors: Vec<_> = registry.descriptors().collect();
        Output::json(&serde_json::to_value(descriptors)?);
        return Ok(());
    }

    Output::header("Available tools");
    for descriptor in registry.descriptors() {
        Output::tool(descriptor);
    }
    println!();

    Ok(())
}

/// Run one tool outside the agent loop and print its result.
pub async fn run_exec(tool: &str, params: &str, settings: Settings) -> Result<()> {
    let parameters: Value =
        serde_json::from_str(params).context("--params is not valid JSON")?;

    let registry = ToolRegistry::from_settings(&settings);
    let result = registry
        .execute(tool, &parameters, &CancellationToken::new())
        .await;

    Output::json(&result);

    match result.get("error").and_then(Value::as_str) {
        Some(error) => Err(anyhow::anyhow!("{} failed: {}", tool, error)),
        None => Ok(()),
    }
}
