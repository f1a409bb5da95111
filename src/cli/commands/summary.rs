//! Summary command implementation.

use crate::agent::ToolRegistry;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Print the consolidated media summaries for one or both platforms.
pub async fn run_summary(platform: &str, settings: Settings) -> Result<()> {
    let registry = ToolRegistry::from_settings(&settings);
    let result = registry
        .execute(
            "get_media_summary",
            &json!({ "platform": platform }),
            &CancellationToken::new(),
        )
        .await;

    if let Some(error) = result.get("error").and_then(Value::as_str) {
        Output::error(error);
        if let Some(suggestion) = result.get("suggestion").and_then(Value::as_str) {
            Output::info(suggestion);
        }
        return Err(anyhow::anyhow!(error.to_string()));
    }

    if let Some(Value::Object(summaries)) = result.get("summaries") {
        for (name, summary) in summaries {
            Output::header(&format!("{} summary", name));
            match summary {
                Value::Object(fields) => {
                    for (key, value) in fields {
                        let text = match value {
                            Value::String(s) => s.clone(),
                            Value::Object(_) | Value::Array(_) => {
                                serde_json::to_string_pretty(value)?
                            }
                            other => other.to_string(),
                        };
                        Output::kv(key, &text);
                    }
                }
                other => Output::json(other),
            }
        }
        println!();
    }

    Ok(())
}
