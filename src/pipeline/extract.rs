//! Rule extraction: one paragraph → one [`RuleFragment`].
//!
//! ## Retry Strategy
//!
//! Each paragraph gets at most [`RetryPolicy::max_attempts`] model calls. A
//! call that errors, or whose text is not a JSON object, is logged and
//! followed by a fixed [`RetryPolicy::delay`]; the delay also follows the
//! last failed attempt, so an exhausted budget of `n` costs `n` calls and
//! `n` delays. When the budget is spent the extractor returns
//! [`RuleFragment::fallback`]: the paragraph itself under the sentinel
//! category. [`RuleExtractor::extract`] therefore never fails.
//!
//! The delay goes through [`Sleeper`] so tests can count it without waiting.

use crate::config::{ExtractionConfig, DEFAULT_CATEGORY};
use crate::error::CallError;
use crate::llm::{CompletionRequest, LanguageModel};
use crate::output::Conditions;
use crate::prompts::{rule_prompt, DEFAULT_RULE_PROMPT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded, fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Summary, category and conditions for one paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFragment {
    /// Never empty.
    pub summary: String,
    /// Never empty.
    pub category: String,
    pub conditions: Conditions,
}

impl RuleFragment {
    /// The fragment used when the model gave nothing usable.
    pub fn fallback(paragraph: &str, category: &str) -> Self {
        Self {
            summary: paragraph.to_string(),
            category: category.to_string(),
            conditions: Conditions::new(),
        }
    }
}

/// Where a fragment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentSource {
    Model,
    Fallback,
}

/// A fragment plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub fragment: RuleFragment,
    pub source: FragmentSource,
    /// Model calls made for this paragraph.
    pub attempts: u32,
    /// One entry per failed attempt, in order.
    pub errors: Vec<CallError>,
}

impl Extraction {
    pub fn used_fallback(&self) -> bool {
        self.source == FragmentSource::Fallback
    }
}

/// Turns paragraphs into fragments through a [`LanguageModel`].
pub struct RuleExtractor {
    model: Arc<dyn LanguageModel>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    prompt_template: String,
    temperature: f32,
    max_tokens: usize,
    fallback_category: String,
}

impl RuleExtractor {
    /// An extractor with the default prompt, temperature 0 and the
    /// default sentinel category.
    pub fn new(model: Arc<dyn LanguageModel>, sleeper: Arc<dyn Sleeper>, policy: RetryPolicy) -> Self {
        Self {
            model,
            sleeper,
            policy,
            prompt_template: DEFAULT_RULE_PROMPT.to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            fallback_category: DEFAULT_CATEGORY.to_string(),
        }
    }

    /// An extractor configured from an [`ExtractionConfig`].
    pub fn from_config(model: Arc<dyn LanguageModel>, config: &ExtractionConfig) -> Self {
        let sleeper = config
            .sleeper
            .clone()
            .unwrap_or_else(|| Arc::new(TokioSleeper));
        Self::new(model, sleeper, config.retry_policy())
            .with_prompt_template(config.prompt_template())
            .with_sampling(config.temperature, config.max_tokens)
            .with_fallback_category(&config.fallback_category)
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_fallback_category(mut self, category: impl Into<String>) -> Self {
        self.fallback_category = category.into();
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn fallback_category(&self) -> &str {
        &self.fallback_category
    }

    /// Extract a fragment for `paragraph`. Always returns exactly one.
    pub async fn extract(&self, paragraph: &str) -> Extraction {
        let request = CompletionRequest {
            system: None,
            prompt: rule_prompt(&self.prompt_template, paragraph),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut errors = Vec::new();
        for attempt in 1..=self.policy.max_attempts {
            let outcome = match self.model.complete(&request).await {
                Ok(body) => parse_fragment(&body, paragraph, &self.fallback_category),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(fragment) => {
                    return Extraction {
                        fragment,
                        source: FragmentSource::Model,
                        attempts: attempt,
                        errors,
                    };
                }
                Err(e) => {
                    warn!(
                        "{} error (attempt {}/{}): {}",
                        self.model.model_id(),
                        attempt,
                        self.policy.max_attempts,
                        e
                    );
                    errors.push(e);
                    self.sleeper.sleep(self.policy.delay).await;
                }
            }
        }

        Extraction {
            fragment: RuleFragment::fallback(paragraph, &self.fallback_category),
            source: FragmentSource::Fallback,
            attempts: self.policy.max_attempts,
            errors,
        }
    }
}

/// Parse a model answer into a fragment.
///
/// The answer must be a JSON object, optionally wrapped in a Markdown code
/// fence. Missing or blank `summary` / `category` fall back to the
/// paragraph / `fallback_category`; `conditions` keeps boolean entries only.
pub fn parse_fragment(
    body: &str,
    paragraph: &str,
    fallback_category: &str,
) -> Result<RuleFragment, CallError> {
    let json_str = strip_code_fence(body);
    let value: Value =
        serde_json::from_str(json_str).map_err(|e| CallError::MalformedJson(e.to_string()))?;
    let obj = value.as_object().ok_or_else(|| {
        CallError::MalformedJson(format!("expected an object, got {}", json_kind(&value)))
    })?;

    let summary = non_blank_str(obj, "summary").unwrap_or(paragraph).to_string();
    let category = non_blank_str(obj, "category")
        .unwrap_or(fallback_category)
        .to_string();
    let conditions = obj
        .get("conditions")
        .and_then(Value::as_object)
        .map(boolean_conditions)
        .unwrap_or_default();

    Ok(RuleFragment {
        summary,
        category,
        conditions,
    })
}

fn non_blank_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn boolean_conditions(raw: &Map<String, Value>) -> Conditions {
    raw.iter()
        .filter_map(|(name, value)| match value.as_bool() {
            Some(b) => Some((name.clone(), b)),
            None => {
                debug!("Dropping non-boolean condition '{}': {}", name, value);
                None
            }
        })
        .collect()
}

/// Strip a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.split_once('\n').map(|(_, r)| r).unwrap_or(rest);
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
