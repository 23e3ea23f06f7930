//! services/api/src/adapters/analysis_llm.rs
//!
//! This module contains the adapter for the class-analysis LLM.
//! It implements the `AnalysisModel` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use mood_insight_core::ports::{AnalysisModel, ModelReply, PortError, PortResult};
use tracing::debug;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1500;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnalysisModel` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnalysisAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAnalysisAdapter {
    /// Creates a new `OpenAiAnalysisAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `AnalysisModel` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisModel for OpenAiAnalysisAdapter {
    fn model_name(&self) -> &str {
        &self.model
    }

    /// Asks the model for a JSON object answering `prompt`.
    async fn complete_json(&self, system: &str, prompt: &str) -> PortResult<ModelReply> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(TEMPERATURE)
            .max_tokens(MAX_TOKENS)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let tokens_used = response.usage.as_ref().map(|u| u.total_tokens);
        debug!(model = %self.model, ?tokens_used, "Analysis model replied");

        // Extract the text content from the first choice in the response.
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Analysis LLM response contained no text content.".to_string())
            })?;

        Ok(ModelReply {
            content,
            tokens_used,
        })
    }
}
