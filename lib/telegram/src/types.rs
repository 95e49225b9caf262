//! Bot API object types.
//!
//! Fields the relay never reads are left out; serde ignores them.

use serde::{Deserialize, Serialize};

/// Envelope wrapping every Bot API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i32>,
    pub parameters: Option<ResponseParameters>,
}

/// Extra information attached to some errors.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseParameters {
    pub retry_after: Option<u64>,
}

/// An incoming update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier, used as the polling offset.
    pub update_id: i64,
    /// New incoming message, if this update carries one.
    pub message: Option<Message>,
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Identifier unique within the chat.
    pub message_id: i64,
    /// Sender; absent for channel posts.
    pub from: Option<User>,
    /// The chat the message belongs to.
    pub chat: Chat,
    /// Unix time the message was sent.
    pub date: i64,
    /// Text for text messages.
    pub text: Option<String>,
}

/// A chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat identifier.
    pub id: i64,
    /// `private`, `group`, `supergroup` or `channel`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// A Telegram user or bot.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: i64,
    /// True for bots.
    pub is_bot: bool,
    /// First name.
    pub first_name: String,
    /// Username without the leading `@`.
    pub username: Option<String>,
}

/// Text formatting mode for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    /// Legacy Markdown.
    Markdown,
    /// MarkdownV2.
    MarkdownV2,
    /// HTML.
    #[serde(rename = "HTML")]
    Html,
}

/// A custom keyboard shown in place of the system keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardMarkup {
    /// Rows of buttons.
    pub keyboard: Vec<Vec<KeyboardButton>>,
    /// Shrink the keyboard to fit its buttons.
    pub resize_keyboard: bool,
    /// Hide the keyboard after one use.
    pub one_time_keyboard: bool,
}

impl ReplyKeyboardMarkup {
    /// A persistent, resized keyboard with a single row.
    #[must_use]
    pub fn single_row<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keyboard: vec![labels.into_iter().map(KeyboardButton::new).collect()],
            resize_keyboard: true,
            one_time_keyboard: false,
        }
    }
}

/// One keyboard button; pressing it sends its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    /// Button label and the text sent on press.
    pub text: String,
}

impl KeyboardButton {
    /// Creates a button.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
