//! Pipeline stages for document field extraction.
//!
//! Each submodule implements exactly one step and is independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ convert ──▶ prompt ──▶ llm ──▶ parse
//! (size/type)  (text API)  (template) (chat)  (JSON)
//! ```
//!
//! 1. [`validate`] — reject unsupported or oversized uploads before any I/O
//! 2. [`convert`]  — external PDF-to-text call with linear-backoff retry,
//!    plus page-count / title / author heuristics
//! 3. [`crate::prompts`] — fixed per-kind checklist around the extracted text
//! 4. [`llm`]      — one completion call, never retried
//! 5. [`parse`]    — strict JSON-object parse of the completion text

pub mod convert;
pub mod llm;
pub mod parse;
pub mod validate;

use crate::error::IntakeError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Await `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<F>(cancel: &CancellationToken, fut: F) -> Result<F::Output, IntakeError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(IntakeError::Cancelled),
        out = fut => Ok(out),
    }
}
