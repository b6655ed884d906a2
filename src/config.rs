//! Configuration types for document extraction.
//!
//! Every endpoint, credential and policy the pipeline needs is carried in
//! [`IntakeConfig`] and handed to each component at construction. Nothing is
//! read from process-wide state once the config is built; the CLI is the
//! only place that consults environment variables.

use crate::error::IntakeError;
use edgequake_llm::LLMProvider;
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default chat-completions endpoint.
pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Largest document accepted by the validator (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Media type of PDF uploads.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// A bearer credential. Redacted in `Debug` output.
pub struct ApiKey(Secret<String>);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Secret::new(key.into()))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.0.expose_secret().clone())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Retry policy for the conversion service.
///
/// Attempt `n` (1-based) waits `(n - 1) * base_delay` before it is sent, so
/// the default policy sleeps 1 s then 2 s between its three attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Default: 3.
    pub max_attempts: u32,
    /// Linear backoff unit. Default: 1 s.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before the given 1-based attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * attempt.saturating_sub(1)
    }
}

/// Bounds enforced by the file validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    /// Maximum document size in bytes. Default: 10 MiB.
    pub max_file_size: u64,
    /// Accepted declared media types. Default: `application/pdf` only.
    pub allowed_media_types: Vec<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_media_types: vec![PDF_MEDIA_TYPE.to_string()],
        }
    }
}

/// Configuration for a document-extraction pipeline.
///
/// Built via [`IntakeConfig::builder()`] or using [`IntakeConfig::default()`].
///
/// # Example
/// ```rust
/// use propdoc_extract::IntakeConfig;
///
/// let config = IntakeConfig::builder()
///     .conversion_url("https://convert.example.com/v1/pdf")
///     .api_key("sk-test")
///     .model("gpt-4")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct IntakeConfig {
    /// Endpoint of the PDF-to-text conversion service.
    pub conversion_url: Option<String>,

    /// Optional bearer credential for the conversion service.
    pub conversion_api_key: Option<ApiKey>,

    /// Chat-completions endpoint. Default: OpenAI.
    pub completion_url: String,

    /// Bearer credential for the completion endpoint.
    pub api_key: Option<ApiKey>,

    /// Completion model identifier. Default: `gpt-4`.
    pub model: String,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Maximum completion tokens. Default: 2000.
    pub max_tokens: usize,

    /// Conversion retry policy.
    pub retry: RetryPolicy,

    /// File validator bounds.
    pub validation: ValidationRules,

    /// Per-HTTP-request timeout. Default: none (client default).
    pub request_timeout: Option<Duration>,

    /// Wall-clock bound on a whole pipeline run. Default: none.
    pub deadline: Option<Duration>,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    /// When set, completions go through the provider instead of `completion_url`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over everything else.
    pub provider: Option<Arc<dyn LLMProvider>>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            conversion_url: None,
            conversion_api_key: None,
            completion_url: DEFAULT_COMPLETION_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            retry: RetryPolicy::default(),
            validation: ValidationRules::default(),
            request_timeout: None,
            deadline: None,
            provider_name: None,
            provider: None,
        }
    }
}

impl fmt::Debug for IntakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntakeConfig")
            .field("conversion_url", &self.conversion_url)
            .field("conversion_api_key", &self.conversion_api_key)
            .field("completion_url", &self.completion_url)
            .field("api_key", &self.api_key)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("retry", &self.retry)
            .field("validation", &self.validation)
            .field("request_timeout", &self.request_timeout)
            .field("deadline", &self.deadline)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .finish()
    }
}

impl IntakeConfig {
    /// Create a new builder for `IntakeConfig`.
    pub fn builder() -> IntakeConfigBuilder {
        IntakeConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a `reqwest` client honouring `request_timeout`.
    pub(crate) fn http_client(&self) -> Result<reqwest::Client, IntakeError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| IntakeError::Internal(format!("Failed to build HTTP client: {e}")))
    }
}

/// Builder for [`IntakeConfig`].
#[derive(Debug)]
pub struct IntakeConfigBuilder {
    config: IntakeConfig,
}

impl IntakeConfigBuilder {
    pub fn conversion_url(mut self, url: impl Into<String>) -> Self {
        self.config.conversion_url = Some(url.into());
        self
    }

    pub fn conversion_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.conversion_api_key = Some(ApiKey::new(key));
        self
    }

    pub fn completion_url(mut self, url: impl Into<String>) -> Self {
        self.config.completion_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(ApiKey::new(key));
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
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
        self.config.retry.max_attempts = n;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry.base_delay = delay;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.validation.max_file_size = bytes;
        self
    }

    pub fn allowed_media_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.validation.allowed_media_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = Some(deadline);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IntakeConfig, IntakeError> {
        let c = &self.config;
        if c.retry.max_attempts == 0 {
            return Err(IntakeError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.validation.max_file_size == 0 {
            return Err(IntakeError::InvalidConfig(
                "max_file_size must be > 0".into(),
            ));
        }
        if c.validation.allowed_media_types.is_empty() {
            return Err(IntakeError::InvalidConfig(
                "at least one media type must be allowed".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(IntakeError::InvalidConfig("max_tokens must be > 0".into()));
        }
        if let Some(url) = &c.conversion_url {
            check_http_url("conversion_url", url)?;
        }
        check_http_url("completion_url", &c.completion_url)?;
        if c.deadline == Some(Duration::ZERO) {
            return Err(IntakeError::InvalidConfig("deadline must be > 0".into()));
        }
        Ok(self.config)
    }
}

fn check_http_url(field: &str, url: &str) -> Result<(), IntakeError> {
    match reqwest::Url::parse(url) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(()),
        _ => Err(IntakeError::InvalidConfig(format!(
            "{field} must be an http(s) URL, got '{url}'"
        ))),
    }
}
