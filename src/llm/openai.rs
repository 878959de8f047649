//! OpenAI-compatible chat-completions client.
//!
//! Works against api.openai.com and any server speaking the same protocol
//! (Azure-style gateways, LiteLLM, vLLM, Ollama's `/v1`). HTTP failures are
//! classified into [`CallError`] variants; the body of a successful answer
//! is returned untouched for the caller to parse.

use super::{CompletionRequest, LanguageModel};
use crate::error::{CallError, RulesError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Longest slice of an error body kept in [`CallError::Api`].
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Client for one model on one OpenAI-compatible endpoint.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatModel {
    /// Create a client. `endpoint` is the API base, e.g. `https://api.openai.com/v1`.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, RulesError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RulesError::Internal(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout_secs,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CallError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CallError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    CallError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &text));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CallError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                CallError::Provider(format!("unexpected response envelope: {e}"))
            }
        })?;

        let content = first_content(parsed)?;
        debug!("{} answered with {} chars", self.model, content.len());
        Ok(content)
    }
}

/// Map a non-success HTTP status to a [`CallError`].
fn classify_status(status: u16, body: &str) -> CallError {
    match status {
        401 | 403 => CallError::Auth { status },
        429 => CallError::RateLimited,
        _ => CallError::Api {
            status,
            body: body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
        },
    }
}

fn first_content(response: ChatResponse) -> Result<String, CallError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(CallError::EmptyResponse)
}
