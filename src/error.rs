//! Error types for the propdoc-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`IntakeError`] — **Terminal**: the pipeline run is over. Returned as
//!   `Err(IntakeError)` from [`crate::extract::DocumentPipeline::run`] and the
//!   top-level `extract*` functions. Exactly one is reported per failed run.
//!
//! * [`ConversionAttemptError`] — **Transient**: a single call to the
//!   conversion service failed. The converter retries these and, once the
//!   retry budget is spent, replaces them with
//!   [`IntakeError::ConversionFailed`]. They never reach the caller.
//!
//! Callers that need to react differently per failure category should match
//! on [`IntakeError::kind`] rather than on message text.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons the file validator rejects a document before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No document was supplied, or it has zero bytes.
    #[error("No file provided. Select a PDF document to upload.")]
    MissingFile,

    /// Declared media type is not in the allowed set.
    #[error("Invalid file format. Only PDF files are allowed.")]
    UnsupportedType { media_type: String },

    /// Document exceeds the configured size bound.
    #[error("File size exceeds {} limit.", size_limit(.limit))]
    TooLarge { size: u64, limit: u64 },
}

const MIB: u64 = 1024 * 1024;

/// Whole mebibytes as `NMB`, anything else in bytes.
fn size_limit(limit: &u64) -> String {
    if *limit >= MIB && limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else {
        format!("{limit} bytes")
    }
}

/// All terminal errors returned by the propdoc-extract library.
#[derive(Debug, Error)]
pub enum IntakeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The document failed validation; never retried.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// Every conversion attempt failed. The transient detail is logged, not
    /// surfaced.
    #[error("PDF conversion failed after multiple attempts")]
    ConversionFailed { attempts: u32 },

    // ── Completion errors ─────────────────────────────────────────────────
    /// The completion service reported a failure; its message is surfaced unchanged.
    #[error("{message}")]
    UpstreamCompletion { message: String },

    /// No completion backend could be configured (missing API key etc.).
    #[error("Completion provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Parse errors ──────────────────────────────────────────────────────
    /// The completion text is not a well-formed JSON object.
    #[error("Failed to parse extracted data: {detail}")]
    Parse { detail: String },

    // ── Run control ───────────────────────────────────────────────────────
    /// The caller cancelled the run.
    #[error("Document processing was cancelled")]
    Cancelled,

    /// The configured whole-run deadline elapsed.
    #[error("Document processing exceeded the {limit_ms}ms deadline")]
    DeadlineExceeded { limit_ms: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure category of an [`IntakeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conversion,
    Completion,
    Parse,
    Cancelled,
    Deadline,
    Configuration,
    Io,
    Internal,
}

impl IntakeError {
    /// The failure category, for callers that branch on it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::Validation(_) => ErrorKind::Validation,
            IntakeError::FileNotFound { .. }
            | IntakeError::PermissionDenied { .. }
            | IntakeError::OutputWriteFailed { .. } => ErrorKind::Io,
            IntakeError::ConversionFailed { .. } => ErrorKind::Conversion,
            IntakeError::UpstreamCompletion { .. } => ErrorKind::Completion,
            IntakeError::Parse { .. } => ErrorKind::Parse,
            IntakeError::Cancelled => ErrorKind::Cancelled,
            IntakeError::DeadlineExceeded { .. } => ErrorKind::Deadline,
            IntakeError::ProviderNotConfigured { .. } | IntakeError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            IntakeError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the end user can fix this by uploading a different file.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::Parse)
    }
}

/// A single failed call to the conversion service.
///
/// Retried by [`crate::pipeline::convert::PdfToText`]; never returned to
/// the caller of the pipeline.
#[derive(Debug, Clone, Error)]
pub enum ConversionAttemptError {
    /// The service answered with a non-2xx status.
    #[error("conversion service returned HTTP {status}")]
    Status { status: u16 },

    /// The request did not complete (connect, TLS, timeout, …).
    #[error("conversion request failed: {0}")]
    Transport(String),

    /// The body was not JSON or had no string `text` field.
    #[error("conversion response had no extracted text: {0}")]
    MissingText(String),
}
