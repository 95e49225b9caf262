//! Conversation history store for visage.
//!
//! This crate provides:
//!
//! - **Message model**: role-tagged, append-only conversation turns
//! - **HistoryStore**: the persistence contract used by the orchestrator
//! - **PgHistoryStore**: PostgreSQL implementation over a managed pool
//! - **InMemoryHistoryStore**: process-local implementation for tests and
//!   database-less runs

pub mod error;
pub mod memory;
pub mod message;
pub mod postgres;
pub mod store;

pub use error::HistoryError;
pub use memory::InMemoryHistoryStore;
pub use message::{Message, MessageRole};
pub use postgres::PgHistoryStore;
pub use store::HistoryStore;
