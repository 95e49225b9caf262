//! Completion-service primitives for visage.
//!
//! This crate provides:
//!
//! - **CompletionBackend**: the request/response contract with a hosted
//!   LLM inference endpoint
//! - **build_prompt**: assembly of the system instruction and stored
//!   history into the message list sent to the model
//! - **OpenAiCompatibleBackend**: an HTTP adapter for endpoints speaking
//!   the OpenAI chat-completions protocol (Hugging Face router, OpenAI,
//!   vLLM, Ollama)

pub mod backend;
pub mod error;
pub mod openai;
pub mod prompt;

pub use backend::{
    ChatMessage, CompletionBackend, CompletionRequest, CompletionResponse, DEFAULT_MAX_TOKENS,
    TokenUsage,
};
pub use error::LlmError;
pub use openai::{CompletionConfig, OpenAiCompatibleBackend};
pub use prompt::{DEFAULT_SYSTEM_INSTRUCTION, build_prompt};
