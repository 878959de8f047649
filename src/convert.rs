//! Extraction entry points.
//!
//! [`extract_rules`] runs the whole pipeline and returns the document in
//! memory; [`extract_rules_to_file`] also writes it. [`rules_from_pages`]
//! starts from already-read pages, for callers that bring their own text.

use crate::config::ExtractionConfig;
use crate::error::RulesError;
use crate::llm::{resolve_model, LanguageModel};
use crate::output::{ExtractionOutput, ExtractionStats, RulesDocument};
use crate::pipeline::assemble::{assemble_rules, LocatedFragment};
use crate::pipeline::extract::{Extraction, RuleExtractor};
use crate::pipeline::paragraphs::split_paragraphs;
use crate::pipeline::reader::{read_pages, Page, PdfTextBackend, PdfiumBackend};
use crate::pipeline::{input, write};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extract compliance rules from a PDF file or URL.
///
/// # Errors
/// Only fatal errors are returned: the input cannot be resolved or opened,
/// or no model is configured. Paragraphs the model cannot handle become
/// fallback rules (see `output.stats.fallback_rules`).
pub async fn extract_rules(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, RulesError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;

    // ── Step 2: Resolve model ────────────────────────────────────────────
    let model = resolve_model(config)?;
    debug!("Using model {}", model.model_id());

    // ── Step 3: Read pages ───────────────────────────────────────────────
    let backend: Arc<dyn PdfTextBackend> = match config.text_backend {
        Some(ref backend) => Arc::clone(backend),
        None => Arc::new(PdfiumBackend::new(config.pdfium_lib_path.clone())),
    };
    let read_start = Instant::now();
    let pages = read_pages(
        backend,
        resolved.path(),
        config.password.as_deref(),
        &config.pages,
    )
    .await?;
    let read_duration_ms = read_start.elapsed().as_millis() as u64;
    info!("Read {} pages in {}ms", pages.len(), read_duration_ms);

    // ── Step 4: Paragraphs → rules ───────────────────────────────────────
    let mut output = rules_from_pages(&pages, resolved.source_file_name(), model, config).await;
    output.stats.read_duration_ms = read_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Extraction complete: {} rules ({} fallback), {}ms total",
        output.document.rules_found.len(),
        output.stats.fallback_rules,
        output.stats.total_duration_ms
    );
    Ok(output)
}

/// Extract rules and write them to `output_path`.
///
/// The file is replaced atomically. On a write failure the extracted rules
/// are lost.
pub async fn extract_rules_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, RulesError> {
    let output = extract_rules(input_str, config).await?;
    write::write_document(&output.document, output_path.as_ref()).await?;
    info!("Wrote {}", output_path.as_ref().display());
    Ok(output.stats)
}

/// Synchronous wrapper around [`extract_rules`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_rules_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, RulesError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RulesError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_rules(input_str, config))
}

/// Run the paragraph → rule stages over already-read pages.
///
/// Never fails: every paragraph yields exactly one rule.
pub async fn rules_from_pages(
    pages: &[Page],
    source_file: impl Into<String>,
    model: Arc<dyn LanguageModel>,
    config: &ExtractionConfig,
) -> ExtractionOutput {
    let jobs: Vec<ParagraphJob<'_>> = pages
        .iter()
        .flat_map(|page| {
            split_paragraphs(&page.text)
                .into_iter()
                .enumerate()
                .map(move |(index, text)| ParagraphJob {
                    page: page.page_number,
                    index,
                    text,
                })
        })
        .collect();

    let empty_pages = pages
        .iter()
        .filter(|p| !jobs.iter().any(|j| j.page == p.page_number))
        .count();
    debug!(
        "{} paragraphs across {} pages ({} empty)",
        jobs.len(),
        pages.len(),
        empty_pages
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(pages.len(), jobs.len());
    }

    let extractor = RuleExtractor::from_config(model, config);
    let llm_start = Instant::now();
    let results = if config.concurrency > 1 {
        process_concurrent(&extractor, &jobs, config).await
    } else {
        process_sequential(&extractor, &jobs, config).await
    };
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let mut stats = ExtractionStats {
        total_pages: pages.len(),
        empty_pages,
        total_paragraphs: jobs.len(),
        llm_duration_ms,
        ..Default::default()
    };
    let mut fragments = Vec::with_capacity(results.len());
    for (job, extraction) in results {
        stats.total_attempts += u64::from(extraction.attempts);
        if extraction.used_fallback() {
            stats.fallback_rules += 1;
        } else {
            stats.model_rules += 1;
        }
        fragments.push(LocatedFragment {
            page: job.page,
            index: job.index,
            fragment: extraction.fragment,
        });
    }

    let rules = assemble_rules(fragments, extractor.fallback_category());

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(rules.len(), stats.fallback_rules);
    }

    ExtractionOutput {
        document: RulesDocument {
            source_file: source_file.into(),
            rules_found: rules,
        },
        stats,
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct ParagraphJob<'a> {
    page: u32,
    index: usize,
    text: &'a str,
}

async fn extract_one<'a>(
    extractor: &RuleExtractor,
    job: ParagraphJob<'a>,
    config: &ExtractionConfig,
) -> (ParagraphJob<'a>, Extraction) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_paragraph_start(job.page, job.index);
    }
    let extraction = extractor.extract(job.text).await;
    if let Some(ref cb) = config.progress_callback {
        match extraction.errors.last() {
            Some(e) if extraction.used_fallback() => {
                cb.on_paragraph_fallback(job.page, job.index, &e.to_string())
            }
            _ => cb.on_paragraph_complete(job.page, job.index, extraction.attempts),
        }
    }
    (job, extraction)
}

/// One paragraph at a time, in document order.
async fn process_sequential<'a>(
    extractor: &RuleExtractor,
    jobs: &[ParagraphJob<'a>],
    config: &ExtractionConfig,
) -> Vec<(ParagraphJob<'a>, Extraction)> {
    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        results.push(extract_one(extractor, *job, config).await);
    }
    results
}

/// Up to `config.concurrency` paragraphs in flight; completion order is
/// arbitrary and restored by the assembler.
async fn process_concurrent<'a>(
    extractor: &RuleExtractor,
    jobs: &[ParagraphJob<'a>],
    config: &ExtractionConfig,
) -> Vec<(ParagraphJob<'a>, Extraction)> {
    stream::iter(jobs.iter().map(|job| extract_one(extractor, *job, config)))
        .buffer_unordered(config.concurrency)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use crate::llm::CompletionRequest;
    use crate::pipeline::extract::Sleeper;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedModel(&'static str);

    #[async_trait]
    impl LanguageModel for FixedModel {
        fn model_id(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, CallError> {
            Ok(self.0.to_string())
        }
    }

    struct NoSleep;

    #[async_trait]
    impl Sleeper for NoSleep {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn config() -> ExtractionConfig {
        ExtractionConfig::builder()
            .sleeper(Arc::new(NoSleep))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_pages_are_counted_and_skipped() {
        let pages = vec![
            Page::new(1, "   "),
            Page::new(2, "a\n\nb"),
            Page::new(3, ""),
        ];
        let model = Arc::new(FixedModel(r#"{"summary":"s","category":"c"}"#));
        let out = rules_from_pages(&pages, "x.pdf", model, &config()).await;

        assert_eq!(out.stats.total_pages, 3);
        assert_eq!(out.stats.empty_pages, 2);
        assert_eq!(out.stats.total_paragraphs, 2);
        assert_eq!(out.stats.model_rules, 2);
        assert_eq!(out.stats.total_attempts, 2);
        let ids: Vec<&str> = out.document.rules_found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["2_0", "2_1"]);
    }

    #[tokio::test]
    async fn unparseable_answers_count_as_fallback() {
        let pages = vec![Page::new(1, "only paragraph")];
        let model = Arc::new(FixedModel("no json here"));
        let out = rules_from_pages(&pages, "x.pdf", model, &config()).await;

        assert_eq!(out.stats.fallback_rules, 1);
        assert_eq!(out.stats.total_attempts, 3);
        assert_eq!(out.document.rules_found[0].obligation, "only paragraph");
        assert_eq!(out.document.source_file, "x.pdf");
    }
}
