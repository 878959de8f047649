//! # regrules
//!
//! Turn regulatory PDF documents into structured compliance rules with a
//! language model, then match those rules against a business profile.
//!
//! Each paragraph of the document becomes exactly one rule. When the model
//! cannot produce a usable answer after a bounded number of attempts, the
//! paragraph itself is kept as the obligation under a catch-all category,
//! so a run never loses text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Read       per-page text via pdfium (spawn_blocking)
//!  ├─ 3. Split      paragraphs on blank lines
//!  ├─ 4. Extract    summary / category / conditions per paragraph,
//!  │                retry with fixed delay, fallback on exhaustion
//!  ├─ 5. Assemble   ids "<page>_<index>", (page, index) order
//!  └─ 6. Write      pretty JSON, atomic replace
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use regrules::{extract_rules_to_file, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     let stats = extract_rules_to_file("regs.pdf", "data/processed_rules.json", &config).await?;
//!     eprintln!("{} rules, {} fallback", stats.total_paragraphs, stats.fallback_rules);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `regrules` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod llm;
pub mod matching;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, PageSelection};
pub use convert::{extract_rules, extract_rules_sync, extract_rules_to_file, rules_from_pages};
pub use error::{CallError, RulesError};
pub use llm::{CompletionRequest, LanguageModel, OpenAiChatModel, ProviderModel};
pub use matching::{match_rules, matches, BusinessProfile};
pub use output::{Conditions, ExtractionOutput, ExtractionStats, Rule, RulesDocument};
pub use pipeline::extract::{Extraction, RetryPolicy, RuleExtractor, RuleFragment, Sleeper};
pub use pipeline::reader::{Page, PdfTextBackend, PdfiumBackend};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::{build_report, generate_report, Report, ReportSource};
