//! Pipeline orchestration and top-level entry points.
//!
//! [`DocumentPipeline::run`] sequences the stages for one uploaded document:
//!
//! ```text
//! Validating ─▶ Converting ─▶ Prompting ─▶ Completing ─▶ Parsing ─▶ Done
//!      └─────────────┴─────────────┴─────────────┴───────────┴──▶ Failed
//! ```
//!
//! A stage starts only after the previous one succeeded; the first error is
//! returned unchanged and nothing after it runs. Progress is one 0–100 value:
//! validation owns 0–20, conversion 20–80, and prompt / completion / parse
//! share the last 20.
//!
//! Nothing is shared between runs, so one pipeline can serve any number of
//! concurrent uploads.

use crate::config::IntakeConfig;
use crate::document::{DocumentKind, UploadedDocument};
use crate::error::IntakeError;
use crate::output::{ExtractedContent, ExtractionResult};
use crate::pipeline::cancellable;
use crate::pipeline::convert::{ConversionService, HttpConversionService, PdfToText};
use crate::pipeline::llm::{CompletionService, HttpCompletionService, ProviderCompletion};
use crate::pipeline::parse::parse_completion;
use crate::pipeline::validate::validate_document;
use crate::progress::{
    ExtractionProgressCallback, NoopProgressCallback, PipelineStage, ProgressTracker,
};
use crate::prompts::build_prompt;
use async_trait::async_trait;
use edgequake_llm::ProviderFactory;
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// Overall progress at the end of each stage.
const VALIDATED: u8 = 20;
const CONVERTED: u8 = 80;
const PROMPTED: u8 = 85;
const COMPLETED: u8 = 95;
const PARSED: u8 = 100;

/// Validate → convert → prompt → complete → parse, for one document at a time.
pub struct DocumentPipeline {
    config: IntakeConfig,
    converter: PdfToText,
    completion: Arc<dyn CompletionService>,
}

impl DocumentPipeline {
    /// Build a pipeline whose services come from `config`.
    ///
    /// The completion backend is resolved from most to least specific:
    /// a pre-built `provider`, then a named `provider_name`, then the HTTP
    /// endpoint at `completion_url` with `api_key`.
    pub fn new(config: IntakeConfig) -> Result<Self, IntakeError> {
        let conversion = Arc::new(HttpConversionService::from_config(&config)?);
        let completion = resolve_completion(&config)?;
        Ok(Self::with_services(config, conversion, completion))
    }

    /// Build a pipeline that can only run [`extract_text`](Self::extract_text).
    ///
    /// Needs `conversion_url` but no completion credential; [`run`](Self::run)
    /// fails with [`IntakeError::ProviderNotConfigured`] after conversion.
    pub fn text_only(config: IntakeConfig) -> Result<Self, IntakeError> {
        let conversion = Arc::new(HttpConversionService::from_config(&config)?);
        Ok(Self::with_services(config, conversion, Arc::new(NoCompletion)))
    }

    /// Build a pipeline around caller-supplied services.
    pub fn with_services(
        config: IntakeConfig,
        conversion: Arc<dyn ConversionService>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        let converter = PdfToText::new(conversion, config.retry);
        Self {
            config,
            converter,
            completion,
        }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Run the full pipeline on one document.
    ///
    /// Returns the parsed record, or the first error encountered. `progress`
    /// sees non-decreasing values ending at 100 on success; `cancel` is
    /// honoured at every await point.
    pub async fn run(
        &self,
        document: &UploadedDocument,
        kind: DocumentKind,
        progress: &dyn ExtractionProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult, IntakeError> {
        let tracker = ProgressTracker::new(progress);
        let start = Instant::now();
        info!("Processing {} document: {}", kind, document.file_name);

        let outcome = self
            .with_deadline(self.run_stages(document, kind, &tracker, cancel))
            .await;

        finish(&tracker, &outcome);
        if outcome.is_ok() {
            info!(
                "Extracted {} document in {}ms",
                kind,
                start.elapsed().as_millis()
            );
        }
        outcome
    }

    /// Validate and convert only; no completion call is made.
    pub async fn extract_text(
        &self,
        document: &UploadedDocument,
        progress: &dyn ExtractionProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<ExtractedContent, IntakeError> {
        let tracker = ProgressTracker::new(progress);
        let outcome = self
            .with_deadline(async {
                check_cancelled(cancel)?;
                tracker.stage(PipelineStage::Validating);
                validate_document(Some(document), &self.config.validation)?;
                tracker.report(VALIDATED);

                tracker.stage(PipelineStage::Converting);
                self.converter
                    .convert(document, &tracker.span(VALIDATED, PARSED), cancel)
                    .await
            })
            .await;
        finish(&tracker, &outcome);
        outcome
    }

    async fn run_stages(
        &self,
        document: &UploadedDocument,
        kind: DocumentKind,
        tracker: &ProgressTracker<'_>,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult, IntakeError> {
        check_cancelled(cancel)?;

        // ── Step 1: Validate ─────────────────────────────────────────────
        tracker.stage(PipelineStage::Validating);
        validate_document(Some(document), &self.config.validation)?;
        tracker.span(0, VALIDATED).report(100);

        // ── Step 2: Convert (retries internally) ─────────────────────────
        tracker.stage(PipelineStage::Converting);
        let content = self
            .converter
            .convert(document, &tracker.span(VALIDATED, CONVERTED), cancel)
            .await?;

        // ── Step 3: Build prompt ─────────────────────────────────────────
        check_cancelled(cancel)?;
        tracker.stage(PipelineStage::Prompting);
        let prompt = build_prompt(&content, kind);
        debug!("Prompt: {} chars", prompt.len());
        tracker.report(PROMPTED);

        // ── Step 4: Completion (single attempt) ──────────────────────────
        tracker.stage(PipelineStage::Completing);
        let raw = cancellable(cancel, self.completion.complete(&prompt)).await??;
        tracker.report(COMPLETED);

        // ── Step 5: Parse ────────────────────────────────────────────────
        check_cancelled(cancel)?;
        tracker.stage(PipelineStage::Parsing);
        let result = parse_completion(&raw)?;
        debug!("Parsed {} fields", result.len());
        tracker.report(PARSED);

        Ok(result)
    }

    async fn with_deadline<T, F>(&self, fut: F) -> Result<T, IntakeError>
    where
        F: Future<Output = Result<T, IntakeError>>,
    {
        match self.config.deadline {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or_else(|_| Err(deadline_error(limit))),
            None => fut.await,
        }
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), IntakeError> {
    if cancel.is_cancelled() {
        Err(IntakeError::Cancelled)
    } else {
        Ok(())
    }
}

fn deadline_error(limit: Duration) -> IntakeError {
    IntakeError::DeadlineExceeded {
        limit_ms: limit.as_millis() as u64,
    }
}

/// Report the terminal stage to the caller.
fn finish<T>(tracker: &ProgressTracker<'_>, outcome: &Result<T, IntakeError>) {
    match outcome {
        Ok(_) => {
            tracker.stage(PipelineStage::Done);
            tracker.sink().on_complete();
        }
        Err(e) => {
            tracker.stage(PipelineStage::Failed);
            tracker.sink().on_error(&e.to_string());
        }
    }
}

/// Stand-in backend for [`DocumentPipeline::text_only`].
struct NoCompletion;

#[async_trait]
impl CompletionService for NoCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, IntakeError> {
        Err(IntakeError::ProviderNotConfigured {
            provider: "none".into(),
            hint: "This pipeline was built for text extraction only.".into(),
        })
    }
}

/// Resolve the completion backend.
fn resolve_completion(config: &IntakeConfig) -> Result<Arc<dyn CompletionService>, IntakeError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderCompletion::new(Arc::clone(provider), config)));
    }

    // 2) Named edgequake-llm provider
    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, &config.model).map_err(|e| {
            IntakeError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        return Ok(Arc::new(ProviderCompletion::new(provider, config)));
    }

    // 3) Direct chat-completions endpoint
    Ok(Arc::new(HttpCompletionService::from_config(config)?))
}

// ── Convenience entry points ─────────────────────────────────────────────

/// Extract form fields from a local file.
///
/// # Example
/// ```rust,no_run
/// use propdoc_extract::{extract, DocumentKind, IntakeConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = IntakeConfig::builder()
///     .conversion_url("https://convert.example.com/v1/pdf")
///     .api_key(std::env::var("OPENAI_API_KEY")?)
///     .build()?;
/// let record = extract("lease.pdf", DocumentKind::Tenant, &config).await?;
/// println!("{}", serde_json::to_string_pretty(&record)?);
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    path: impl AsRef<Path>,
    kind: DocumentKind,
    config: &IntakeConfig,
) -> Result<ExtractionResult, IntakeError> {
    let document = UploadedDocument::from_path(path).await?;
    let pipeline = DocumentPipeline::new(config.clone())?;
    pipeline
        .run(&document, kind, &NoopProgressCallback, &CancellationToken::new())
        .await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    path: impl AsRef<Path>,
    kind: DocumentKind,
    config: &IntakeConfig,
) -> Result<ExtractionResult, IntakeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| IntakeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(path, kind, config))
}

/// Extract a local file's text and metadata without calling the model.
///
/// Needs only `conversion_url`; no completion credential.
pub async fn extract_text(
    path: impl AsRef<Path>,
    config: &IntakeConfig,
) -> Result<ExtractedContent, IntakeError> {
    let document = UploadedDocument::from_path(path).await?;
    DocumentPipeline::text_only(config.clone())?
        .extract_text(&document, &NoopProgressCallback, &CancellationToken::new())
        .await
}

/// Extract and write the record as pretty JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    path: impl AsRef<Path>,
    kind: DocumentKind,
    output_path: impl AsRef<Path>,
    config: &IntakeConfig,
) -> Result<ExtractionResult, IntakeError> {
    let result = extract(path, kind, config).await?;
    write_json(output_path, &result).await?;
    Ok(result)
}

/// Write `value` as pretty JSON via temp file + rename.
pub async fn write_json(
    output_path: impl AsRef<Path>,
    value: &impl Serialize,
) -> Result<(), IntakeError> {
    let path = output_path.as_ref();
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| IntakeError::Internal(format!("Failed to serialise output: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| IntakeError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, format!("{json}\n"))
        .await
        .map_err(|e| IntakeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| IntakeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}
