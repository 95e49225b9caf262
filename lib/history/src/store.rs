//! The history persistence contract.

use crate::error::HistoryError;
use crate::message::{Message, MessageRole};
use async_trait::async_trait;
use rootcause::Report;
use visage_core::ConversationId;

/// Trait for conversation history storage.
///
/// Implementations keep an append-only, per-conversation log. A
/// conversation's history comes into existence with its first append and
/// disappears entirely on [`delete_all`](HistoryStore::delete_all).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Ensures the backing schema exists. Safe to call repeatedly.
    async fn init(&self) -> Result<(), Report<HistoryError>>;

    /// Appends one turn and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidRole`] for system turns, and a store
    /// error if the write fails.
    async fn append(
        &self,
        conversation_id: ConversationId,
        role: MessageRole,
        content: &str,
    ) -> Result<Message, Report<HistoryError>>;

    /// Returns every turn of the conversation in the order appended.
    ///
    /// An unknown conversation yields an empty vector.
    async fn get_all(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, Report<HistoryError>>;

    /// Removes every turn of the conversation and returns how many were
    /// removed. Removing an empty conversation is not an error.
    async fn delete_all(&self, conversation_id: ConversationId)
    -> Result<u64, Report<HistoryError>>;
}

/// Rejects roles that must never be written to history.
pub(crate) fn ensure_persistable(role: MessageRole) -> Result<(), HistoryError> {
    if role.is_persistable() {
        Ok(())
    } else {
        Err(HistoryError::InvalidRole {
            role: role.to_string(),
        })
    }
}
