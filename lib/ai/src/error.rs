//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause. None of these
//! are fatal to the process: the orchestrator turns every variant into the
//! fixed apology sent back to the user.

use std::fmt;

/// Errors from completion backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// No API credential is configured.
    MissingCredential { provider: String },
    /// Provider could not be reached.
    ProviderUnavailable { provider: String, reason: String },
    /// Provider answered with a non-success status.
    RequestFailed { status: u16, body: String },
    /// Response parsing failed or carried no reply.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential { provider } => {
                write!(f, "no API credential configured for '{provider}'")
            }
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "LLM provider '{provider}' unavailable: {reason}")
            }
            Self::RequestFailed { status, body } => {
                write!(f, "LLM request failed with status {status}: {body}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}
