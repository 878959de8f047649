//! CLI binary for regrules.
//!
//! A thin shim over the library crate: `extract` maps flags to
//! `ExtractionConfig` and writes the rules file, `report` loads a rules file
//! and prints a licensing report for a business profile.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use regrules::llm::resolve_model;
use regrules::{
    build_report, extract_rules_to_file, generate_report, match_rules, BusinessProfile,
    ExtractionConfig, ExtractionConfigBuilder, ExtractionProgressCallback, PageSelection,
    ProgressCallback, Report, ReportSource, RulesDocument,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over paragraphs, with a log line for every fallback.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<(u32, usize), Instant>>,
    fallbacks: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_extraction_start` reports the paragraph count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER_TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            fallbacks: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} paragraphs  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page: u32, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&(page, index)))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize, total_paragraphs: usize) {
        self.activate_bar(total_paragraphs);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "{total_paragraphs} paragraphs on {total_pages} pages"
            ))
        ));
    }

    fn on_paragraph_start(&self, page: u32, index: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert((page, index), Instant::now());
        }
        self.bar.set_message(format!("{page}_{index}"));
    }

    fn on_paragraph_complete(&self, page: u32, index: usize, attempts: u32) {
        let secs = self.elapsed_secs(page, index);
        if attempts > 1 {
            self.bar.println(format!(
                "  {} {page}_{index}  {}",
                cyan("↻"),
                dim(&format!("{attempts} attempts, {secs:.1}s")),
            ));
        }
        self.bar.inc(1);
    }

    fn on_paragraph_fallback(&self, page: u32, index: usize, error: &str) {
        let secs = self.elapsed_secs(page, index);
        self.fallbacks.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(Some('\u{2026}')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {page}_{index}  fallback: {}  {}",
            yellow("⚠"),
            yellow(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_rules: usize, fallback_rules: usize) {
        self.bar.finish_and_clear();
        if fallback_rules == 0 {
            eprintln!("{} {} rules extracted", green("✔"), bold(&total_rules.to_string()));
        } else {
            eprintln!(
                "{} {} rules extracted  ({} fallback)",
                cyan("⚠"),
                bold(&total_rules.to_string()),
                yellow(&fallback_rules.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract rules (writes data/processed_rules.json)
  regrules extract "18-07-2022_4.2A.pdf"

  # Custom output, two attempts per paragraph, first ten pages
  regrules extract regs.pdf -o out/rules.json --max-attempts 2 --pages 1-10

  # Use another provider through edgequake-llm
  regrules extract regs.pdf --provider anthropic --model claude-sonnet-4-20250514

  # Licensing report for a 80 m² restaurant with 30 seats serving meat
  regrules report data/processed_rules.json --area 80 --seats 30 --serves-meat

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (default provider)
  ANTHROPIC_API_KEY       Used with --provider anthropic
  GEMINI_API_KEY          Used with --provider gemini
  REGRULES_*              Every flag, e.g. REGRULES_MODEL, REGRULES_MAX_ATTEMPTS
  RUST_LOG                Overrides the log filter
"#;

/// Turn regulatory PDFs into structured compliance rules.
#[derive(Parser, Debug)]
#[command(
    name = "regrules",
    version,
    about = "Turn regulatory PDFs into structured compliance rules",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "REGRULES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "REGRULES_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract rules from a PDF file or URL into a JSON file.
    Extract(ExtractArgs),
    /// Print a licensing report for a business from a rules file.
    Report(ReportArgs),
}

/// Flags that select and authenticate the language model.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Model ID.
    #[arg(long, env = "REGRULES_MODEL", default_value = regrules::config::DEFAULT_MODEL)]
    model: String,

    /// edgequake-llm provider (anthropic, gemini, ollama, …). Default: OpenAI-compatible client.
    #[arg(long, env = "REGRULES_PROVIDER")]
    provider: Option<String>,

    /// API key for the OpenAI-compatible client. Falls back to OPENAI_API_KEY.
    #[arg(long, env = "REGRULES_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, env = "REGRULES_ENDPOINT", default_value = regrules::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Per-call timeout in seconds.
    #[arg(long, env = "REGRULES_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Where to write the rules JSON.
    #[arg(short, long, env = "REGRULES_OUTPUT", default_value = "data/processed_rules.json")]
    output: PathBuf,

    #[command(flatten)]
    model: ModelArgs,

    /// Model calls per paragraph before falling back.
    #[arg(long, env = "REGRULES_MAX_ATTEMPTS", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Delay after each failed call, in milliseconds.
    #[arg(long, env = "REGRULES_RETRY_DELAY_MS", default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Paragraphs in flight at once.
    #[arg(short, long, env = "REGRULES_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "REGRULES_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "REGRULES_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Category for paragraphs the model could not handle.
    #[arg(long, env = "REGRULES_FALLBACK_CATEGORY", default_value = regrules::config::DEFAULT_CATEGORY)]
    fallback_category: String,

    /// Text file with a custom prompt containing `{paragraph}`.
    #[arg(long, env = "REGRULES_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Path to libpdfium. Default: system library.
    #[arg(long, env = "REGRULES_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "REGRULES_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Rules file written by `regrules extract`.
    rules: PathBuf,

    /// Floor area in square metres.
    #[arg(long, env = "REGRULES_AREA", default_value_t = 0.0)]
    area: f64,

    /// Number of seats.
    #[arg(long, env = "REGRULES_SEATS", default_value_t = 0)]
    seats: u32,

    /// The business serves meat.
    #[arg(long, env = "REGRULES_SERVES_MEAT")]
    serves_meat: bool,

    /// The business makes deliveries.
    #[arg(long, env = "REGRULES_DELIVERIES")]
    deliveries: bool,

    /// Ask the language model to write the report.
    #[arg(long, env = "REGRULES_LLM")]
    llm: bool,

    /// Print `{source, text}` as JSON.
    #[arg(long, env = "REGRULES_JSON")]
    json: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are hidden while the progress bar is active.
    let show_progress = match cli.command {
        Command::Extract(ref args) => !cli.quiet && !args.no_progress,
        Command::Report(_) => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Extract(ref args) => run_extract(args, show_progress, cli.quiet).await,
        Command::Report(ref args) => run_report(args).await,
    }
}

async fn run_extract(args: &ExtractArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_extract_config(args, progress_cb).await?;
    let stats = extract_rules_to_file(&args.input, &args.output, &config)
        .await
        .context("Extraction failed")?;

    if !quiet {
        eprintln!(
            "Processed {} rules into {}",
            stats.total_paragraphs,
            bold(&args.output.display().to_string())
        );
        eprintln!(
            "   {} pages  /  {} model calls  /  {}ms",
            dim(&stats.total_pages.to_string()),
            dim(&stats.total_attempts.to_string()),
            stats.total_duration_ms,
        );
    }
    Ok(())
}

async fn run_report(args: &ReportArgs) -> Result<()> {
    let document = RulesDocument::load(&args.rules)
        .with_context(|| format!("Failed to load rules from {}", args.rules.display()))?;

    let profile = BusinessProfile {
        area: args.area,
        seats: args.seats,
        serves_meat: args.serves_meat,
        deliveries: args.deliveries,
    };
    let matched = match_rules(&document.rules_found, &profile);
    tracing::info!(
        "{} of {} rules apply",
        matched.len(),
        document.rules_found.len()
    );

    let report = if args.llm {
        let config = model_config(&args.model)
            .build()
            .context("Invalid configuration")?;
        let model = resolve_model(&config).context("No language model available")?;
        generate_report(model.as_ref(), &profile, &matched).await
    } else {
        Report {
            source: ReportSource::Fallback,
            text: build_report(&profile, &matched),
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        println!("{}", report.text);
    }
    Ok(())
}

/// Builder preloaded with the model flags; credentials are resolved here,
/// once, and never read again by the library.
fn model_config(args: &ModelArgs) -> ExtractionConfigBuilder {
    let mut builder = ExtractionConfig::builder()
        .model(args.model.clone())
        .endpoint(args.endpoint.clone())
        .request_timeout_secs(args.api_timeout);

    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .filter(|k| !k.trim().is_empty());
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }
    builder
}

/// Map `extract` flags to `ExtractionConfig`.
async fn build_extract_config(
    args: &ExtractArgs,
    progress: Option<ProgressCallback>,
) -> Result<ExtractionConfig> {
    let pages: PageSelection = args.pages.parse().context("Invalid --pages")?;

    let mut builder = model_config(&args.model)
        .max_attempts(args.max_attempts)
        .retry_delay_ms(args.retry_delay_ms)
        .concurrency(args.concurrency)
        .pages(pages)
        .fallback_category(args.fallback_category.clone());

    if let Some(ref path) = args.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {}", path.display()))?;
        builder = builder.prompt_template(template);
    }
    if let Some(ref password) = args.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref lib) = args.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
