//! Chat completions over the OpenAI wire format.

use super::ChatModel;
use crate::config::LlmSettings;
use crate::error::{Result, YoutubotError};
use crate::openai::create_client_with;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Chat model served by OpenAI or any compatible endpoint such as Ollama.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    /// Create a chat model for `model` at `api_base`.
    pub fn new(model: &str, api_base: Option<&str>, temperature: f32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with(api_base, timeout)?,
            model: model.to_string(),
            temperature,
        })
    }

    /// Create a chat model from settings, honouring `OLLAMA_HOST`.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_base = settings.resolved_api_base();
        Self::new(
            &settings.model,
            api_base.as_deref(),
            settings.temperature,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| YoutubotError::Llm(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .build()
            .map_err(|e| YoutubotError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| YoutubotError::OpenAI(format!("Failed to generate response: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| YoutubotError::Llm("Empty response from LLM".to_string()))?
            .trim()
            .to_string();

        debug!("Model replied with {} characters", answer.len());
        Ok(answer)
    }
}
