//! Language model boundary for the agent loop.

use crate::config::ModelSettings;
use crate::error::{FeedscopeError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, instrument};

/// Finite, forward-only sequence of text chunks.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A text-in, text-out model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier for logs.
    fn name(&self) -> &str;

    /// Send one prompt and wait for the whole reply.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Send one prompt and receive the reply incrementally.
    ///
    /// Defaults to the full reply as a single chunk.
    async fn stream(&self, prompt: &str) -> Result<TextStream> {
        let text = self.complete(prompt).await?;
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }
}

/// Drain a stream into one string, failing on the first errored chunk.
pub async fn collect_text(mut chunks: TextStream) -> Result<String> {
    let mut text = String::new();
    while let Some(chunk) = chunks.next().await {
        text.push_str(&chunk?);
    }
    Ok(text)
}

/// OpenAI chat completions, one user message per prompt.
pub struct OpenAIModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIModel {
    pub fn new(model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            temperature,
        })
    }

    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        Self::new(
            &settings.name,
            settings.temperature,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn request(
        &self,
        prompt: &str,
    ) -> Result<async_openai::types::CreateChatCompletionRequest> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| FeedscopeError::Model(e.to_string()))?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .build()
            .map_err(|e| FeedscopeError::Model(e.to_string()))
    }
}

#[async_trait]
impl LanguageModel for OpenAIModel {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.request(prompt)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| FeedscopeError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        debug!("Model replied with {} chars", text.len());
        Ok(text)
    }

    async fn stream(&self, prompt: &str) -> Result<TextStream> {
        let request = self.request(prompt)?;

        let upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| FeedscopeError::OpenAI(format!("Chat stream failed: {}", e)))?;

        let chunks = upstream.filter_map(|item| async move {
            match item {
                Ok(response) => response
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.clone())
                    .filter(|s| !s.is_empty())
                    .map(Ok),
                Err(e) => Some(Err(FeedscopeError::OpenAI(format!("Chat stream failed: {}", e)))),
            }
        });

        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl LanguageModel for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_default_stream_is_single_chunk() {
        let chunks: Vec<_> = Echo.stream("hello").await.unwrap().collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), "HELLO");
    }

    #[tokio::test]
    async fn test_collect_text_concatenates() {
        let parts: TextStream = Box::pin(stream::iter(vec![
            Ok("{\"action\": ".to_string()),
            Ok("\"answer\"}".to_string()),
        ]));
        assert_eq!(collect_text(parts).await.unwrap(), "{\"action\": \"answer\"}");
    }

    #[tokio::test]
    async fn test_collect_text_propagates_errors() {
        let parts: TextStream = Box::pin(stream::iter(vec![
            Ok("partial".to_string()),
            Err(FeedscopeError::Model("connection reset".to_string())),
        ]));
        assert!(collect_text(parts).await.is_err());
    }
}
