//! Configuration types for PDF-to-rules extraction.
//!
//! All run behaviour is controlled through [`ExtractionConfig`], built via
//! its [`ExtractionConfigBuilder`]. Credentials, endpoint and model id live
//! here and are resolved once at startup; nothing downstream reads the
//! process environment.

use crate::error::RulesError;
use crate::llm::LanguageModel;
use crate::pipeline::extract::{RetryPolicy, Sleeper};
use crate::pipeline::reader::PdfTextBackend;
use crate::progress::{ExtractionProgressCallback, ProgressCallback};
use crate::prompts::{DEFAULT_RULE_PROMPT, PARAGRAPH_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Base URL of the OpenAI-compatible chat-completions API.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Sentinel category ("general") for paragraphs the model could not classify.
pub const DEFAULT_CATEGORY: &str = "כללי";

/// Configuration for a PDF-to-rules extraction run.
///
/// # Example
/// ```rust
/// use regrules::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .api_key("sk-test")
///     .model("gpt-4o-mini")
///     .max_attempts(3)
///     .build()
///     .unwrap();
/// assert_eq!(config.retry_policy().max_attempts, 3);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier. Default: `gpt-4o-mini`.
    pub model: String,

    /// Named edgequake-llm provider (`anthropic`, `gemini`, `ollama`, …).
    /// `None` or `"openai"` selects the built-in OpenAI-compatible client.
    pub provider_name: Option<String>,

    /// API key for the OpenAI-compatible client.
    pub api_key: Option<String>,

    /// Base URL for the OpenAI-compatible client. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Pre-constructed model client. Takes precedence over every other
    /// provider setting.
    pub model_client: Option<Arc<dyn LanguageModel>>,

    /// Sampling temperature. Default: 0.0 so that identical paragraphs map
    /// to identical fragments.
    pub temperature: f32,

    /// Maximum tokens the model may generate per paragraph. Default: 1024.
    pub max_tokens: usize,

    /// Attempts per paragraph before the fallback fragment is used. Default: 3.
    pub max_attempts: u32,

    /// Fixed delay after each failed attempt, in milliseconds. Default: 1000.
    pub retry_delay_ms: u64,

    /// Per-request HTTP timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Paragraph calls in flight at once. Default: 1 (strictly sequential).
    ///
    /// Values above 1 only change completion order; rules are always
    /// reassembled by page and paragraph position.
    pub concurrency: usize,

    /// Category used when the model gives none. Default: [`DEFAULT_CATEGORY`].
    pub fallback_category: String,

    /// Custom prompt template; must contain `{paragraph}`.
    pub prompt_template: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit libpdfium location. `None` binds the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Pre-constructed PDF text backend. Takes precedence over pdfium.
    pub text_backend: Option<Arc<dyn PdfTextBackend>>,

    /// Delay implementation used between attempts. `None` uses tokio's timer.
    pub sleeper: Option<Arc<dyn Sleeper>>,

    /// Receives per-paragraph progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model_client: None,
            temperature: 0.0,
            max_tokens: 1024,
            max_attempts: 3,
            retry_delay_ms: 1000,
            request_timeout_secs: 60,
            concurrency: 1,
            fallback_category: DEFAULT_CATEGORY.to_string(),
            prompt_template: None,
            pages: PageSelection::default(),
            password: None,
            pdfium_lib_path: None,
            text_backend: None,
            sleeper: None,
            progress_callback: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field(
                "model_client",
                &self.model_client.as_ref().map(|_| "<dyn LanguageModel>"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("fallback_category", &self.fallback_category)
            .field("pages", &self.pages)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The bounded retry policy for paragraph calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// The prompt template in effect.
    pub fn prompt_template(&self) -> &str {
        self.prompt_template.as_deref().unwrap_or(DEFAULT_RULE_PROMPT)
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model_client(mut self, client: Arc<dyn LanguageModel>) -> Self {
        self.config.model_client = Some(client);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_delay_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn fallback_category(mut self, category: impl Into<String>) -> Self {
        self.config.fallback_category = category.into();
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn text_backend(mut self, backend: Arc<dyn PdfTextBackend>) -> Self {
        self.config.text_backend = Some(backend);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.config.sleeper = Some(sleeper);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ExtractionProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, RulesError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(RulesError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(RulesError::InvalidConfig("model must not be empty".into()));
        }
        if c.fallback_category.trim().is_empty() {
            return Err(RulesError::InvalidConfig(
                "fallback category must not be empty".into(),
            ));
        }
        if let Some(ref template) = c.prompt_template {
            if !template.contains(PARAGRAPH_PLACEHOLDER) {
                return Err(RulesError::InvalidConfig(format!(
                    "prompt template must contain the {PARAGRAPH_PLACEHOLDER} placeholder"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the PDF to read.
///
/// Page numbers in the produced rules stay physical: reading only page 3
/// yields ids `3_0`, `3_1`, …
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Read all pages (default).
    #[default]
    All,
    /// Read a single page (1-indexed).
    Single(usize),
    /// Read a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Read specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl FromStr for PageSelection {
    type Err = RulesError;

    /// Parse `all`, `5`, `3-15` or `1,3,5,7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let parse_page = |p: &str| -> Result<usize, RulesError> {
            let page: usize = p
                .trim()
                .parse()
                .map_err(|_| RulesError::InvalidConfig(format!("Invalid page number: '{}'", p.trim())))?;
            if page < 1 {
                return Err(RulesError::InvalidConfig(
                    "Pages are 1-indexed, minimum is 1 (got 0)".into(),
                ));
            }
            Ok(page)
        };

        if s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            let start = parse_page(start)?;
            let end = parse_page(end)?;
            if start > end {
                return Err(RulesError::InvalidConfig(format!(
                    "Invalid page range '{start}-{end}': start must be <= end"
                )));
            }
            return Ok(PageSelection::Range(start, end));
        }

        if s.contains(',') {
            let pages = s.split(',').map(parse_page).collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }

        Ok(PageSelection::Single(parse_page(&s)?))
    }
}
