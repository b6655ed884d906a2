//! Completion client: send the prompt, return the model's raw text.
//!
//! This stage makes exactly one outbound call and never retries. A
//! non-success answer becomes [`IntakeError::UpstreamCompletion`] carrying the
//! service's own error message so the user sees what the provider said
//! (bad key, quota, context length) rather than a generic failure.
//!
//! Two backends implement [`CompletionService`]:
//!
//! * [`HttpCompletionService`] — a chat-completions endpoint spoken directly
//!   over HTTP with a bearer credential.
//! * [`ProviderCompletion`] — any `edgequake_llm` provider (OpenAI,
//!   Anthropic, Gemini, Ollama, …), for deployments that already configure
//!   providers through that crate.

use crate::config::{ApiKey, IntakeConfig};
use crate::error::IntakeError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Fallback when a failed response carries no `error.message`.
pub const GENERIC_COMPLETION_FAILURE: &str = "Completion API request failed";

/// One prompt in, one raw completion string out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, IntakeError>;
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ── HTTP backend ──────────────────────────────────────────────────────────

/// Chat-completions endpoint reached over HTTP.
pub struct HttpCompletionService {
    client: reqwest::Client,
    url: String,
    api_key: ApiKey,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl HttpCompletionService {
    /// Build from the completion fields of `config`.
    ///
    /// Fails with [`IntakeError::ProviderNotConfigured`] when no API key is set.
    pub fn from_config(config: &IntakeConfig) -> Result<Self, IntakeError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| IntakeError::ProviderNotConfigured {
                provider: config.completion_url.clone(),
                hint: "Set an API key (--api-key or OPENAI_API_KEY).".into(),
            })?;
        Ok(Self {
            client: config.http_client()?,
            url: config.completion_url.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(&self, prompt: &str) -> Result<String, IntakeError> {
        let start = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![WireMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| IntakeError::UpstreamCompletion {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IntakeError::UpstreamCompletion {
                message: upstream_error_message(&text),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| IntakeError::UpstreamCompletion {
                    message: format!("Malformed completion response: {e}"),
                })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| IntakeError::UpstreamCompletion {
                message: "Completion response contained no message content".into(),
            })?;

        debug!(
            "Completion: {} chars in {:?} ({})",
            content.len(),
            start.elapsed(),
            self.model
        );
        Ok(content)
    }
}

/// `error.message` from a failure body, or the generic fallback.
fn upstream_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .and_then(|err| err.message)
        .unwrap_or_else(|| GENERIC_COMPLETION_FAILURE.to_string())
}

// ── edgequake-llm backend ─────────────────────────────────────────────────

/// Adapts an `edgequake_llm` provider to [`CompletionService`].
pub struct ProviderCompletion {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl ProviderCompletion {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &IntakeConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl CompletionService for ProviderCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, IntakeError> {
        let messages = vec![ChatMessage::user(prompt)];
        let options = self.options();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| IntakeError::UpstreamCompletion {
                message: e.to_string(),
            })?;
        debug!(
            "Provider completion: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}
