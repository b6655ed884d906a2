//! # propdoc-extract
//!
//! Pre-fill property and tenant forms from uploaded PDF documents.
//!
//! An uploaded PDF is checked, sent to an external text-extraction service,
//! wrapped in a per-form prompt, sent to a chat-completion model, and the
//! model's JSON answer is returned as a field → value record.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Validate  media type (PDF only) and size (≤ 10 MiB)
//!  ├─ 2. Convert   external text-extraction call, linear-backoff retry
//!  ├─ 3. Prompt    fixed field checklist for property | tenant
//!  ├─ 4. Complete  one chat-completion call, no retry
//!  └─ 5. Parse     strict JSON object → ExtractionResult
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use propdoc_extract::{
//!     DocumentKind, DocumentPipeline, IntakeConfig, NoopProgressCallback, UploadedDocument,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IntakeConfig::builder()
//!         .conversion_url("https://convert.example.com/v1/pdf")
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     let pipeline = DocumentPipeline::new(config)?;
//!
//!     let doc = UploadedDocument::from_path("rental-application.pdf").await?;
//!     let record = pipeline
//!         .run(&doc, DocumentKind::Tenant, &NoopProgressCallback, &CancellationToken::new())
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&record)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `propdoc` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod drafts;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ApiKey, IntakeConfig, IntakeConfigBuilder, RetryPolicy, ValidationRules};
pub use document::{DocumentKind, UploadedDocument};
pub use drafts::{PropertyDraft, TenantDraft};
pub use error::{ConversionAttemptError, ErrorKind, IntakeError, ValidationError};
pub use extract::{extract, extract_sync, extract_text, extract_to_file, write_json, DocumentPipeline};
pub use output::{DocumentMetadata, ExtractedContent, ExtractionResult};
pub use pipeline::convert::{ConversionService, HttpConversionService, PdfToText};
pub use pipeline::llm::{CompletionService, HttpCompletionService, ProviderCompletion};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, PipelineStage};
