//! OpenAI-compatible chat-completions adapter.
//!
//! Speaks `POST {base_url}/chat/completions` with a bearer credential. The
//! default configuration targets the Hugging Face inference router.

use crate::backend::{
    ChatMessage, CompletionBackend, CompletionRequest, CompletionResponse, DEFAULT_MAX_TOKENS,
    TokenUsage,
};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Longest slice of an error body kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Configuration for the completion service.
#[derive(Clone, Deserialize)]
pub struct CompletionConfig {
    /// Bearer credential. Missing credentials fail each request, not startup.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Output budget per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature; unset keeps the provider default.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Whole-request timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_model() -> String {
    "meta-llama/Llama-3.1-8B-Instruct".to_string()
}

fn default_base_url() -> String {
    "https://router.huggingface.co/v1".to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            temperature: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Completion backend for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    provider: String,
}

impl OpenAiCompatibleBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] if the base URL does not parse or
    /// the HTTP client cannot be built.
    pub fn new(config: &CompletionConfig) -> Result<Self, Report<LlmError>> {
        let base = reqwest::Url::parse(&config.base_url).map_err(|e| LlmError::InvalidConfig {
            reason: format!("invalid base url '{}': {e}", config.base_url),
        })?;
        let provider = base.host_str().unwrap_or("unknown").to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            provider,
        })
    }

    /// Returns the full chat-completions URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns true if a credential is configured.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn transport_error(&self, error: &reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::ProviderUnavailable {
                provider: self.provider.clone(),
                reason: error.to_string(),
            }
        }
    }
}

impl fmt::Debug for OpenAiCompatibleBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatibleBackend")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("has_credential", &self.has_credential())
            .finish()
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len()))]
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, Report<LlmError>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingCredential {
                provider: self.provider.clone(),
            })?;

        let body = WireRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            stream: false,
            temperature: request.temperature,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs }.into());
        }

        let text = response.text().await.map_err(|e| self.transport_error(&e))?;
        if !status.is_success() {
            return Err(LlmError::RequestFailed {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            }
            .into());
        }

        let completion = parse_response(&text, &self.model)?;
        info!(
            latency_ms = started.elapsed().as_millis() as u64,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "completion received"
        );
        Ok(completion)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Extracts the first choice's reply from a chat-completions body.
fn parse_response(body: &str, requested_model: &str) -> Result<CompletionResponse, LlmError> {
    let wire: WireResponse =
        serde_json::from_str(body).map_err(|e| LlmError::ResponseParseFailed {
            reason: e.to_string(),
        })?;

    let choice = wire
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::ResponseParseFailed {
            reason: "response contained no choices".to_string(),
        })?;

    let content = choice
        .message
        .content
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| LlmError::ResponseParseFailed {
            reason: "first choice carried no content".to_string(),
        })?;

    debug!(finish_reason = ?choice.finish_reason, "parsed completion");
    Ok(CompletionResponse {
        content,
        model: wire.model.unwrap_or_else(|| requested_model.to_string()),
        usage: wire
            .usage
            .map(|usage| TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            })
            .unwrap_or_default(),
        finish_reason: choice.finish_reason,
    })
}
