//! Per-update handling.

use crate::texts;
use rootcause::Report;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use visage_conversation::Orchestrator;
use visage_core::ConversationId;
use visage_history::HistoryError;
use visage_telegram::{
    Command, Incoming, MAX_MESSAGE_CHARS, Message, ParseMode, RESET_BUTTON, ReplyKeyboardMarkup,
    SendMessage, TelegramClient, TelegramError, Update, split_message,
};

/// Answers one update at a time; shared by all handler tasks.
pub struct Handler {
    client: TelegramClient,
    orchestrator: Arc<Orchestrator>,
}

impl Handler {
    /// Creates a handler.
    pub fn new(client: TelegramClient, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            client,
            orchestrator,
        }
    }

    /// Handles one update. Errors are logged and the update is dropped.
    #[instrument(skip(self, update), fields(update_id = update.update_id))]
    pub async fn handle(&self, update: Update) {
        let Some(message) = update.message else {
            debug!("ignoring update without message");
            return;
        };
        let Some(text) = message.text.as_deref() else {
            debug!(chat_id = message.chat.id, "ignoring non-text message");
            return;
        };

        let result = match Incoming::route(text) {
            Incoming::Command(Command::Start | Command::Help) => self.greet(&message).await,
            Incoming::Command(Command::Reset) => self.reset(&message, false).await,
            Incoming::ResetButton => self.reset(&message, true).await,
            Incoming::Command(Command::Unknown(name)) => {
                debug!(chat_id = message.chat.id, command = %name, "unknown command");
                self.client
                    .send_message(
                        &SendMessage::new(message.chat.id, texts::UNKNOWN_COMMAND)
                            .reply_to(message.message_id),
                    )
                    .await
                    .map(|_| ())
            }
            Incoming::Question(question) => self.answer(&message, question).await,
        };

        if let Err(e) = result {
            warn!(chat_id = message.chat.id, error = %e, "failed to respond to update");
        }
    }

    async fn greet(&self, message: &Message) -> Result<(), Report<TelegramError>> {
        let first_name = message.from.as_ref().map(|user| user.first_name.as_str());
        let greeting = SendMessage::new(message.chat.id, texts::greeting(first_name))
            .with_parse_mode(ParseMode::Markdown)
            .with_keyboard(main_keyboard());
        self.client.send_message(&greeting).await.map(|_| ())
    }

    async fn reset(&self, message: &Message, via_button: bool) -> Result<(), Report<TelegramError>> {
        let outcome = self
            .orchestrator
            .reset(ConversationId::new(message.chat.id))
            .await;
        let text = reset_reply(&outcome);

        let reply = if via_button {
            SendMessage::new(message.chat.id, text).with_keyboard(main_keyboard())
        } else {
            SendMessage::new(message.chat.id, text).reply_to(message.message_id)
        };
        self.client.send_message(&reply).await.map(|_| ())
    }

    async fn answer(&self, message: &Message, question: &str) -> Result<(), Report<TelegramError>> {
        let chat_id = message.chat.id;
        let placeholder = match self
            .client
            .send_message(&SendMessage::new(chat_id, texts::THINKING))
            .await
        {
            Ok(sent) => Some(sent.message_id),
            Err(e) => {
                warn!(chat_id, error = %e, "failed to send thinking placeholder");
                None
            }
        };

        let reply = self
            .orchestrator
            .converse(ConversationId::new(chat_id), question)
            .await;
        let mut chunks = split_message(&reply, MAX_MESSAGE_CHARS).into_iter();

        if let Some(placeholder_id) = placeholder {
            if let Some(first) = chunks.next() {
                if let Err(e) = self
                    .client
                    .edit_message_text(chat_id, placeholder_id, &first)
                    .await
                {
                    warn!(chat_id, error = %e, "failed to edit placeholder, sending reply instead");
                    self.client
                        .send_message(&SendMessage::new(chat_id, first))
                        .await?;
                }
            }
        }

        for chunk in chunks {
            self.client
                .send_message(&SendMessage::new(chat_id, chunk))
                .await?;
        }
        Ok(())
    }
}

/// The persistent keyboard with the reset button.
fn main_keyboard() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::single_row([RESET_BUTTON])
}

/// Chooses the reply to a reset request.
fn reset_reply(outcome: &Result<u64, Report<HistoryError>>) -> &'static str {
    match outcome {
        Ok(_) => texts::RESET_DONE,
        Err(_) => texts::RESET_FAILED,
    }
}
