//! PDF-to-text conversion through an external service.
//!
//! ## Retry Strategy
//!
//! The conversion call is the slow, flaky part of a run (multi-second,
//! occasionally 5xx). [`PdfToText`] retries it with *linear* backoff: attempt
//! `n` waits `(n - 1) * base_delay`, so the default 3-attempt / 1 s policy
//! sleeps 1 s then 2 s. Each failure is logged with its detail; once the
//! budget is spent the caller only sees
//! [`IntakeError::ConversionFailed`].
//!
//! ## Metadata
//!
//! Page count and title/author come from cheap text heuristics rather than
//! PDF parsing: pages are separated by form feeds, and many generated PDFs
//! carry `Title:` / `Author:` header lines. A missing header is not an error.

use crate::config::{ApiKey, IntakeConfig, RetryPolicy};
use crate::document::UploadedDocument;
use crate::error::{ConversionAttemptError, IntakeError};
use crate::output::{DocumentMetadata, ExtractedContent};
use crate::pipeline::cancellable;
use crate::progress::ExtractionProgressCallback;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::multipart;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One attempt at turning a document into plain text.
#[async_trait]
pub trait ConversionService: Send + Sync {
    async fn extract_text(
        &self,
        document: &UploadedDocument,
    ) -> Result<String, ConversionAttemptError>;
}

/// Conversion service reached over HTTP.
///
/// Sends the file as a multipart `file` part and expects a 2xx JSON body
/// with a string `text` field.
pub struct HttpConversionService {
    client: reqwest::Client,
    url: String,
    api_key: Option<ApiKey>,
}

impl HttpConversionService {
    pub fn new(client: reqwest::Client, url: impl Into<String>, api_key: Option<ApiKey>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
        }
    }

    /// Build from `config.conversion_url` / `config.conversion_api_key`.
    pub fn from_config(config: &IntakeConfig) -> Result<Self, IntakeError> {
        let url = config.conversion_url.as_deref().ok_or_else(|| {
            IntakeError::InvalidConfig(
                "conversion_url is not set; point it at a PDF-to-text service".into(),
            )
        })?;
        Ok(Self::new(
            config.http_client()?,
            url,
            config.conversion_api_key.clone(),
        ))
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    async fn extract_text(
        &self,
        document: &UploadedDocument,
    ) -> Result<String, ConversionAttemptError> {
        let part = multipart::Part::bytes(document.content.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.media_type)
            .map_err(|e| ConversionAttemptError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConversionAttemptError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConversionAttemptError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ConversionAttemptError::MissingText(e.to_string()))?;

        body.get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ConversionAttemptError::MissingText("no `text` field in body".into()))
    }
}

/// Converter stage: retrying text extraction plus metadata derivation.
pub struct PdfToText {
    service: Arc<dyn ConversionService>,
    retry: RetryPolicy,
}

impl PdfToText {
    pub fn new(service: Arc<dyn ConversionService>, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    /// Convert a validated document.
    ///
    /// `progress` receives stage-local checkpoints: 20 once the first request
    /// is dispatched, 40 when text arrives, 60 after metadata is derived, 80
    /// when the content is assembled and 100 on return.
    pub async fn convert(
        &self,
        document: &UploadedDocument,
        progress: &dyn ExtractionProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<ExtractedContent, IntakeError> {
        let text = self.fetch_with_retry(document, progress, cancel).await?;
        progress.on_progress(40);

        let metadata = derive_metadata(&text);
        progress.on_progress(60);

        info!(
            "Extracted {} chars, {} pages from {}",
            text.len(),
            metadata.page_count,
            document.file_name
        );
        let content = ExtractedContent { text, metadata };
        progress.on_progress(80);

        progress.on_progress(100);
        Ok(content)
    }

    async fn fetch_with_retry(
        &self,
        document: &UploadedDocument,
        progress: &dyn ExtractionProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<String, IntakeError> {
        let attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=attempts {
            let backoff = self.retry.delay_before(attempt);
            if !backoff.is_zero() {
                warn!(
                    "Conversion retry {}/{} after {}ms",
                    attempt - 1,
                    attempts - 1,
                    backoff.as_millis()
                );
                cancellable(cancel, sleep(backoff)).await?;
            }

            if cancel.is_cancelled() {
                return Err(IntakeError::Cancelled);
            }
            if attempt == 1 {
                progress.on_progress(20);
            }
            match cancellable(cancel, self.service.extract_text(document)).await? {
                Ok(text) => {
                    debug!("Conversion succeeded on attempt {}", attempt);
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Conversion attempt {}/{} failed: {}", attempt, attempts, e);
                }
            }
        }

        Err(IntakeError::ConversionFailed { attempts })
    }
}

/// Derive metadata from extracted text. Never fails.
pub fn derive_metadata(text: &str) -> DocumentMetadata {
    DocumentMetadata {
        page_count: count_pages(text),
        title: first_prefixed_line(&RE_TITLE, text),
        author: first_prefixed_line(&RE_AUTHOR, text),
    }
}

fn count_pages(text: &str) -> usize {
    text.matches('\u{000C}').count() + 1
}

// A header line starts after a newline or a form feed; its value stops at either.
static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(?:^|\x0C)[ \t]*Title:([^\n\x0C]*)").unwrap());
static RE_AUTHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(?:^|\x0C)[ \t]*Author:([^\n\x0C]*)").unwrap());

fn first_prefixed_line(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    let value = caps[1].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
