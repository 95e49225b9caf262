//! Per-conversation serialization.
//!
//! Each conversation id maps to an async mutex while at least one task
//! holds or waits for it. Entries are dropped with their last guard so the
//! map only ever contains busy conversations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use visage_core::ConversationId;

type Slot = Arc<AsyncMutex<()>>;

/// Registry of per-conversation locks.
#[derive(Debug, Default)]
pub struct ConversationLocks {
    slots: Mutex<HashMap<ConversationId, Slot>>,
}

impl ConversationLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds the conversation, then claims it.
    pub async fn lock(&self, conversation_id: ConversationId) -> ConversationGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(conversation_id).or_default())
        };
        let guard = Arc::clone(&slot).lock_owned().await;

        ConversationGuard {
            locks: self,
            conversation_id,
            slot,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive claim on one conversation. Released on drop.
#[derive(Debug)]
pub struct ConversationGuard<'a> {
    locks: &'a ConversationLocks,
    conversation_id: ConversationId,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ConversationGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one in this guard: nobody else waits.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.conversation_id);
        }
    }
}
