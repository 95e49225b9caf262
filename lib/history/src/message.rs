//! Message types for conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use visage_core::ConversationId;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The fixed instruction prepended to every model call. Never stored.
    System,
    /// User/human message.
    User,
    /// Model reply.
    Assistant,
}

impl MessageRole {
    /// Returns the lowercase name used on the wire and in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parses a stored role name.
    #[must_use]
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    /// Returns true if turns with this role may be written to history.
    #[must_use]
    pub const fn is_persistable(&self) -> bool {
        matches!(self, Self::User | Self::Assistant)
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored turn of a conversation.
///
/// Messages are immutable once created; the store assigns `id` and
/// `timestamp`. Within a conversation, `(timestamp, id)` is the order in
/// which turns were appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned sequence number.
    pub id: i64,
    /// The conversation this turn belongs to.
    pub conversation_id: ConversationId,
    /// Who produced the turn.
    pub role: MessageRole,
    /// Turn text.
    pub content: String,
    /// When the store accepted the turn.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a turn that was never stored, for use in a single prompt.
    ///
    /// Its `id` is 0, which no store ever assigns.
    #[must_use]
    pub fn unsaved(conversation_id: ConversationId, role: MessageRole, content: &str) -> Self {
        Self {
            id: 0,
            conversation_id,
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Returns true if this is a user turn.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    /// Returns true if this is an assistant turn.
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip() {
        for role in [MessageRole::System, MessageRole::User, MessageRole::Assistant] {
            assert_eq!(MessageRole::from_str_value(role.as_str()), Some(role));
        }
        assert_eq!(MessageRole::from_str_value("tool"), None);
    }

    #[test]
    fn unsaved_message_has_no_store_id() {
        let message = Message::unsaved(ConversationId::new(3), MessageRole::User, "hi");
        assert_eq!(message.id, 0);
        assert!(message.is_user());
    }

    #[test]
    fn system_is_not_persistable() {
        assert!(!MessageRole::System.is_persistable());
        assert!(MessageRole::User.is_persistable());
        assert!(MessageRole::Assistant.is_persistable());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&MessageRole::Assistant).expect("serialize");
        assert_eq!(json, "\"assistant\"");
    }
}
