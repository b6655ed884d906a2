//! CLI binary for propdoc-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `IntakeConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use propdoc_extract::{
    write_json, DocumentKind, DocumentPipeline, ExtractionProgressCallback, ExtractionResult,
    IntakeConfig, PipelineStage, PropertyDraft, TenantDraft, UploadedDocument,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Renders the 0–100 pipeline progress as a single bar, with the current
/// stage as its prefix.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold:>10}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: PipelineStage) {
        match stage {
            PipelineStage::Done | PipelineStage::Failed => {}
            other => self.bar.set_prefix(other.to_string()),
        }
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_complete(&self) {
        self.bar.finish_and_clear();
        eprintln!("{} extraction complete", green("✔"));
    }

    // The error itself is reported once, by `main`.
    fn on_error(&self, _error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} extraction failed", red("✘"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Pre-fill the tenant form from a rental application
  propdoc application.pdf --kind tenant

  # Property brochure, record written to a file
  propdoc brochure.pdf --kind property -o property.json

  # Show the form draft rather than the raw record
  propdoc application.pdf --kind tenant --drafts

  # Only run text extraction (no API key needed)
  propdoc brochure.pdf --text-only

  # Use an edgequake-llm provider instead of the HTTP endpoint
  propdoc brochure.pdf --kind property --provider anthropic --model claude-sonnet-4-20250514

ENVIRONMENT VARIABLES:
  PROPDOC_CONVERSION_URL      Text-extraction service endpoint (required)
  PROPDOC_CONVERSION_API_KEY  Bearer credential for the extraction service
  OPENAI_API_KEY              Completion API key
  PROPDOC_COMPLETION_URL      Chat-completions endpoint
  RUST_LOG                    Log filter (overrides -v / -q)
"#;

/// Pre-fill property and tenant forms from PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "propdoc",
    version,
    about = "Extract property or tenant details from a PDF as JSON",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file.
    input: PathBuf,

    /// Which form the document pre-fills.
    #[arg(short, long, env = "PROPDOC_KIND", value_enum, default_value = "property")]
    kind: KindArg,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "PROPDOC_OUTPUT")]
    output: Option<PathBuf>,

    /// Stop after text extraction and print the text with its metadata.
    #[arg(long, conflicts_with = "drafts")]
    text_only: bool,

    /// Print the reconciled form draft instead of the raw record.
    #[arg(long)]
    drafts: bool,

    /// Text-extraction service endpoint.
    #[arg(long, env = "PROPDOC_CONVERSION_URL")]
    conversion_url: Option<String>,

    /// Bearer credential for the text-extraction service.
    #[arg(long, env = "PROPDOC_CONVERSION_API_KEY", hide_env_values = true)]
    conversion_api_key: Option<String>,

    /// Chat-completions endpoint.
    #[arg(long, env = "PROPDOC_COMPLETION_URL")]
    completion_url: Option<String>,

    /// Completion API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// edgequake-llm provider name (openai, anthropic, gemini, ollama, …).
    #[arg(long, env = "PROPDOC_PROVIDER")]
    provider: Option<String>,

    /// Model ID.
    #[arg(long, env = "PROPDOC_MODEL")]
    model: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PROPDOC_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Completion token cap.
    #[arg(long, env = "PROPDOC_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// Conversion attempts before giving up.
    #[arg(long, env = "PROPDOC_MAX_ATTEMPTS", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..=10))]
    max_attempts: u32,

    /// Base backoff between conversion attempts, in milliseconds.
    #[arg(long, env = "PROPDOC_RETRY_DELAY_MS", default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "PROPDOC_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Abort the whole run after this many seconds.
    #[arg(long, env = "PROPDOC_DEADLINE_SECS")]
    deadline_secs: Option<u64>,

    /// Disable progress bar.
    #[arg(long, env = "PROPDOC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PROPDOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PROPDOC_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Property,
    Tenant,
}

impl From<KindArg> for DocumentKind {
    fn from(v: KindArg) -> Self {
        match v {
            KindArg::Property => DocumentKind::Property,
            KindArg::Tenant => DocumentKind::Tenant,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The bar replaces INFO logs while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    let config = build_config(&cli)?;
    let document = UploadedDocument::from_path(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    // ── Ctrl-C cancels the run ───────────────────────────────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let progress: Box<dyn ExtractionProgressCallback> = if show_progress {
        Box::new(CliProgressCallback::new())
    } else {
        Box::new(propdoc_extract::NoopProgressCallback)
    };

    let start = Instant::now();
    let kind = DocumentKind::from(cli.kind);

    let json = if cli.text_only {
        let pipeline = DocumentPipeline::text_only(config).context("Invalid configuration")?;
        let content = pipeline
            .extract_text(&document, progress.as_ref(), &cancel)
            .await
            .context("Text extraction failed")?;
        serde_json::to_value(&content).context("Failed to serialise output")?
    } else {
        let pipeline = DocumentPipeline::new(config).context("Invalid configuration")?;
        let record = pipeline
            .run(&document, kind, progress.as_ref(), &cancel)
            .await
            .context("Extraction failed")?;
        if cli.drafts {
            draft_value(kind, &record)?
        } else {
            serde_json::Value::from(record)
        }
    };

    // ── Emit ─────────────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        write_json(output_path, &json)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} document  {}ms  →  {}",
                green("✔"),
                kind,
                start.elapsed().as_millis(),
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let text = serde_json::to_string_pretty(&json).context("Failed to serialise output")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{text}").context("Failed to write to stdout")?;
        if !cli.quiet && !show_progress {
            eprintln!("{}", dim(&format!("{}ms total", start.elapsed().as_millis())));
        }
    }

    Ok(())
}

/// Map CLI args to `IntakeConfig`.
fn build_config(cli: &Cli) -> Result<IntakeConfig> {
    let mut builder = IntakeConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_attempts(cli.max_attempts)
        .retry_base_delay(Duration::from_millis(cli.retry_delay_ms));

    if let Some(ref url) = cli.conversion_url {
        builder = builder.conversion_url(url);
    }
    if let Some(ref key) = cli.conversion_api_key {
        builder = builder.conversion_api_key(key);
    }
    if let Some(ref url) = cli.completion_url {
        builder = builder.completion_url(url);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(secs) = cli.request_timeout {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.deadline_secs {
        builder = builder.deadline(Duration::from_secs(secs));
    }

    builder.build().context("Invalid configuration")
}

fn draft_value(kind: DocumentKind, record: &ExtractionResult) -> Result<serde_json::Value> {
    let value = match kind {
        DocumentKind::Property => serde_json::to_value(PropertyDraft::from_result(record)),
        DocumentKind::Tenant => serde_json::to_value(TenantDraft::from_result(record)),
    };
    value.context("Failed to serialise draft")
}
