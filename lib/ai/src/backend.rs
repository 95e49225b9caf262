//! Completion backend abstraction.
//!
//! The orchestrator only sees [`CompletionBackend`]; the concrete HTTP
//! adapter lives in [`crate::openai`].

use crate::error::LlmError;
use async_trait::async_trait;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use visage_history::MessageRole;

/// Default output budget for one reply.
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// One entry of the prompt sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a message with an explicit role.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A request to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Ordered prompt, system instruction first.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature for sampling. `None` leaves the provider default.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Creates a request with the default token budget.
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A response from the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated reply.
    pub content: String,
    /// Model that generated the response.
    pub model: String,
    /// Token usage statistics, when the provider reports them.
    pub usage: TokenUsage,
    /// Why generation stopped, when the provider reports it.
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens.
    pub input_tokens: u32,
    /// Number of output tokens.
    pub output_tokens: u32,
}

/// Trait for completion backends.
///
/// Calls are single request/response: no streaming and no retries.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generates a reply for the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is missing, the service cannot be
    /// reached, or the response carries no usable reply.
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, Report<LlmError>>;

    /// Returns the model name.
    fn model(&self) -> &str;
}
