//! OpenAI client configuration with sensible defaults.

use crate::error::{FeedscopeError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with a custom timeout.
///
/// The API key is read from `OPENAI_API_KEY` by `OpenAIConfig::default()`.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Check whether an OpenAI API key is available in the environment.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.trim().is_empty())
}

/// Fail early with a readable message when no API key is configured.
pub fn require_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(FeedscopeError::Config(
            "OPENAI_API_KEY is not set. Export it before running the agent.".to_string(),
        ))
    }
}
