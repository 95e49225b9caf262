//! Telegram error types.

use std::fmt;

/// Errors from Bot API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelegramError {
    /// The HTTP request could not be completed.
    RequestFailed {
        /// Bot API method name.
        method: &'static str,
        /// Error details, with the token-bearing URL stripped.
        details: String,
    },
    /// The Bot API answered `ok: false`.
    Api {
        /// Bot API method name.
        method: &'static str,
        /// Telegram's error code.
        code: Option<i32>,
        /// Telegram's description.
        description: String,
        /// Seconds to wait when flood control kicked in.
        retry_after: Option<u64>,
    },
    /// The response body did not match the expected shape.
    InvalidResponse {
        /// Bot API method name.
        method: &'static str,
        /// Error details.
        details: String,
    },
}

impl fmt::Display for TelegramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { method, details } => {
                write!(f, "telegram {method} request failed: {details}")
            }
            Self::Api {
                method,
                code,
                description,
                ..
            } => match code {
                Some(code) => write!(f, "telegram {method} rejected ({code}): {description}"),
                None => write!(f, "telegram {method} rejected: {description}"),
            },
            Self::InvalidResponse { method, details } => {
                write!(f, "invalid telegram {method} response: {details}")
            }
        }
    }
}

impl std::error::Error for TelegramError {}
