//! Adapter from `edgequake-llm` providers to [`LanguageModel`].

use super::{CompletionRequest, LanguageModel};
use crate::error::{CallError, RulesError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// A named edgequake-llm provider bound to one model.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    name: String,
    model: String,
}

impl ProviderModel {
    /// Wrap an already-constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
            model: model.into(),
        }
    }

    /// Build a provider through [`ProviderFactory::create_llm_provider`].
    ///
    /// The factory reads the provider's own credentials (`ANTHROPIC_API_KEY`,
    /// `GEMINI_API_KEY`, …); this happens once, while the run is configured.
    pub fn from_factory(provider_name: &str, model: &str) -> Result<Self, RulesError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            RulesError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, provider_name, model))
    }

    /// Provider name as given at construction.
    pub fn provider_name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl LanguageModel for ProviderModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CallError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage::system(system.as_str()));
        }
        messages.push(ChatMessage::user(request.prompt.as_str()));

        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| CallError::Provider(format!("{}: {}", self.name, e)))?;

        debug!(
            "{}/{}: {} input tokens, {} output tokens",
            self.name, self.model, response.prompt_tokens, response.completion_tokens
        );

        let content = response.content.trim().to_string();
        if content.is_empty() {
            return Err(CallError::EmptyResponse);
        }
        Ok(content)
    }
}
