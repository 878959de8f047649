//! Language-model backends.
//!
//! The pipeline talks to a model only through [`LanguageModel`]: one prompt
//! in, one text completion out, failures typed as [`CallError`]. Two
//! implementations ship with the crate:
//!
//! * [`OpenAiChatModel`]: any OpenAI-compatible `/chat/completions`
//!   endpoint, with the API key and base URL passed in explicitly.
//! * [`ProviderModel`]: wraps an `edgequake-llm` provider for everything
//!   else (`anthropic`, `gemini`, `ollama`, …).
//!
//! Tests and embedding applications can supply their own implementation via
//! [`crate::config::ExtractionConfigBuilder::model_client`].

pub mod openai;
pub mod provider;

pub use openai::OpenAiChatModel;
pub use provider::ProviderModel;

use crate::config::ExtractionConfig;
use crate::error::{CallError, RulesError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// One completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Optional system message sent before the prompt.
    pub system: Option<String>,
    /// The user message.
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// A text-completion capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier of the model answering requests, for logs.
    fn model_id(&self) -> &str;

    /// Send one request and return the model's text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CallError>;
}

/// Resolve the model client, from most-specific to least-specific:
///
/// 1. **Pre-built client** (`config.model_client`): used as-is.
/// 2. **Named provider** other than `openai`: built through
///    `edgequake_llm::ProviderFactory`.
/// 3. **OpenAI-compatible client**: requires `config.api_key`.
pub fn resolve_model(config: &ExtractionConfig) -> Result<Arc<dyn LanguageModel>, RulesError> {
    if let Some(ref client) = config.model_client {
        return Ok(Arc::clone(client));
    }

    match config.provider_name.as_deref() {
        Some(name) if !name.eq_ignore_ascii_case("openai") => {
            debug!("Using edgequake-llm provider '{}' with model {}", name, config.model);
            Ok(Arc::new(ProviderModel::from_factory(name, &config.model)?))
        }
        _ => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| RulesError::ProviderNotConfigured {
                    provider: "openai".to_string(),
                    hint: "No API key configured.\n\
                           Pass --api-key, set OPENAI_API_KEY, or choose another --provider."
                        .to_string(),
                })?;
            debug!("Using OpenAI-compatible endpoint {} with model {}", config.endpoint, config.model);
            Ok(Arc::new(OpenAiChatModel::new(
                &config.endpoint,
                api_key,
                &config.model,
                config.request_timeout_secs,
            )?))
        }
    }
}
