//! Telegram Bot API binding for visage.
//!
//! Only the slice of the Bot API the relay needs: long polling for updates,
//! sending and editing text messages, and a reply keyboard. Command routing
//! is kept free of I/O so it can be tested on its own.

mod client;
mod command;
mod error;
mod text;
mod types;

pub use client::{DEFAULT_API_URL, SendMessage, TelegramClient};
pub use command::{Command, Incoming, RESET_BUTTON};
pub use error::TelegramError;
pub use text::{MAX_MESSAGE_CHARS, split_message};
pub use types::{Chat, KeyboardButton, Message, ParseMode, ReplyKeyboardMarkup, Update, User};
