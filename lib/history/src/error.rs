//! Error types for the history crate.
//!
//! Errors are designed for layered context using rootcause. Store
//! implementations return `Report<HistoryError>`; callers decide whether
//! a failure is fatal (startup) or degradable (per message).

use std::fmt;
use visage_core::ConversationId;

/// Errors from history store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The backing store could not be reached.
    StoreUnavailable { operation: &'static str, reason: String },
    /// The store was reachable but the statement failed.
    QueryFailed { operation: &'static str, reason: String },
    /// Only user and assistant turns are persisted.
    InvalidRole { role: String },
    /// A stored row could not be decoded.
    InvalidRow {
        conversation_id: ConversationId,
        reason: String,
    },
}

impl HistoryError {
    /// Returns true if this error means the store is unreachable.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }

    /// Classifies an sqlx error raised while running `operation`.
    pub(crate) fn from_sqlx(operation: &'static str, error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::StoreUnavailable {
                operation,
                reason: error.to_string(),
            },
            _ => Self::QueryFailed {
                operation,
                reason: error.to_string(),
            },
        }
    }
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreUnavailable { operation, reason } => {
                write!(f, "history store unavailable during {operation}: {reason}")
            }
            Self::QueryFailed { operation, reason } => {
                write!(f, "history {operation} failed: {reason}")
            }
            Self::InvalidRole { role } => {
                write!(f, "role '{role}' cannot be stored in history")
            }
            Self::InvalidRow {
                conversation_id,
                reason,
            } => {
                write!(
                    f,
                    "invalid history row for conversation {conversation_id}: {reason}"
                )
            }
        }
    }
}

impl std::error::Error for HistoryError {}
