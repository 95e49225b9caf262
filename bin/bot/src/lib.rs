//! visage bot: wires the Telegram binding to the message orchestrator.
//!
//! The binary in `main.rs` loads [`BotConfig`], opens the history store,
//! and runs a [`Poller`] until a shutdown signal arrives.

pub mod config;
pub mod handler;
pub mod poller;
pub mod texts;

pub use config::{BotConfig, ConfigError, DatabaseConfig, PollingConfig, StorageBackend};
pub use handler::Handler;
pub use poller::{Poller, shutdown_signal};
