//! Answer generation through a chat model.

use super::ContextPayload;
use crate::config::Settings;
use crate::error::{NeighborlyError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// A generative text service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Produce an answer for the assembled context.
    async fn generate(&self, payload: &ContextPayload) -> Result<String>;
}

/// Generate with a deadline. A timeout or blank output is a generation failure.
pub async fn generate_checked(
    model: &dyn LanguageModel,
    payload: &ContextPayload,
    timeout: Duration,
) -> Result<String> {
    let text = tokio::time::timeout(timeout, model.generate(payload))
        .await
        .map_err(|_| NeighborlyError::Generation(format!("timed out after {:?}", timeout)))??;

    if text.trim().is_empty() {
        return Err(NeighborlyError::Generation("Empty response from LLM".to_string()));
    }
    Ok(text)
}

/// Chat model behind an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    /// Create a chat model from the application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = create_client(&settings.provider, settings.generation.timeout())?;
        Ok(Self {
            client,
            model: settings.generation.model.clone(),
            temperature: settings.generation.temperature,
        })
    }

    /// Override the model name.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    #[instrument(skip(self, payload), fields(model = %self.model, documents = payload.documents.len()))]
    async fn generate(&self, payload: &ContextPayload) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(payload.system.clone())
                .build()
                .map_err(|e| NeighborlyError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(payload.render())
                .build()
                .map_err(|e| NeighborlyError::Generation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| NeighborlyError::Generation(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            NeighborlyError::Generation(format!("Failed to generate response: {}", e))
        })?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| NeighborlyError::Generation("Empty response from LLM".to_string()))?
            .clone();

        debug!("Generated response ({} chars)", answer.len());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::rag::ContextAssembler;
    use crate::testing::{ScriptedModel, SlowModel};

    fn payload() -> ContextPayload {
        ContextAssembler::new(Prompts::default()).assemble("hello", &[], &[])
    }

    #[tokio::test]
    async fn test_generate_checked_passes_text_through() {
        let model = ScriptedModel::replying("Hi neighbor!");
        let text = tokio_test::assert_ok!(
            generate_checked(&model, &payload(), Duration::from_secs(1)).await
        );
        assert_eq!(text, "Hi neighbor!");
    }

    #[tokio::test]
    async fn test_generate_checked_rejects_blank_output() {
        let model = ScriptedModel::replying("   \n");
        let err = generate_checked(&model, &payload(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, NeighborlyError::Generation(_)));
    }

    #[tokio::test]
    async fn test_generate_checked_timeout_is_generation_failure() {
        let model = SlowModel::new(Duration::from_secs(5));
        let err = generate_checked(&model, &payload(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, NeighborlyError::Generation(_)));
    }

    #[test]
    fn test_chat_model_from_settings() {
        let mut settings = Settings::default();
        settings.generation.model = "gemini-2.0-flash".to_string();
        let model = OpenAIChatModel::from_settings(&settings).unwrap().with_model("gpt-4o");
        assert_eq!(model.model(), "gpt-4o");
    }
}
