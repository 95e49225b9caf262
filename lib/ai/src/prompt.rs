//! Prompt assembly.

use crate::backend::ChatMessage;
use visage_history::Message;

/// Persona used when no instruction is configured.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "Ты — «Виртуальный визажист», дружелюбный и \
эмпатичный эксперт по косметике. Твоя задача — проанализировать запрос клиента, понять его \
проблему и предложить подходящие типы косметических средств, давая полезные советы. Всегда \
отвечай на русском языке.";

/// Builds the message list for one model call.
///
/// The instruction is always the first entry, followed by the stored
/// history in its original order. The instruction itself is never part of
/// the stored history.
#[must_use]
pub fn build_prompt(system_instruction: &str, history: &[Message]) -> Vec<ChatMessage> {
    let mut prompt = Vec::with_capacity(history.len() + 1);
    prompt.push(ChatMessage::system(system_instruction));
    prompt.extend(
        history
            .iter()
            .map(|message| ChatMessage::new(message.role, message.content.clone())),
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use visage_core::ConversationId;
    use visage_history::MessageRole;

    fn stored(id: i64, role: MessageRole, content: &str) -> Message {
        Message {
            id,
            conversation_id: ConversationId::new(1),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn empty_history_yields_only_instruction() {
        let prompt = build_prompt("be nice", &[]);
        assert_eq!(prompt, vec![ChatMessage::system("be nice")]);
    }

    #[test]
    fn instruction_leads_and_history_order_is_kept() {
        let history = vec![
            stored(1, MessageRole::User, "What helps dark circles?"),
            stored(2, MessageRole::Assistant, "Use a color-correcting concealer."),
            stored(3, MessageRole::User, "Which shade?"),
        ];

        let prompt = build_prompt("persona", &history);

        assert_eq!(
            prompt,
            vec![
                ChatMessage::system("persona"),
                ChatMessage::user("What helps dark circles?"),
                ChatMessage::assistant("Use a color-correcting concealer."),
                ChatMessage::user("Which shade?"),
            ]
        );
    }

    #[test]
    fn default_instruction_sets_language() {
        assert!(DEFAULT_SYSTEM_INSTRUCTION.contains("русском"));
    }
}
