//! Process-local history store.
//!
//! Keeps every conversation in memory. History does not survive a restart,
//! so the bot only uses this backend when explicitly configured to.

use crate::error::HistoryError;
use crate::message::{Message, MessageRole};
use crate::store::{HistoryStore, ensure_persistable};
use async_trait::async_trait;
use chrono::Utc;
use rootcause::Report;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use visage_core::ConversationId;

/// In-memory implementation of [`HistoryStore`].
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    conversations: RwLock<HashMap<ConversationId, Vec<Message>>>,
    next_id: AtomicI64,
}

impl InMemoryHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn init(&self) -> Result<(), Report<HistoryError>> {
        Ok(())
    }

    async fn append(
        &self,
        conversation_id: ConversationId,
        role: MessageRole,
        content: &str,
    ) -> Result<Message, Report<HistoryError>> {
        ensure_persistable(role)?;

        let mut conversations = self.conversations.write().await;
        let message = Message {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            conversation_id,
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        conversations
            .entry(conversation_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn get_all(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, Report<HistoryError>> {
        Ok(self
            .conversations
            .read()
            .await
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_all(
        &self,
        conversation_id: ConversationId,
    ) -> Result<u64, Report<HistoryError>> {
        let removed = self.conversations.write().await.remove(&conversation_id);
        Ok(removed.map_or(0, |messages| messages.len() as u64))
    }
}
