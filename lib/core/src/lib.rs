//! Core domain types and utilities for visage.
//!
//! This crate provides the identifiers and error-handling foundation shared
//! by the history store, the completion adapter and the bot binary.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConversationId, ExchangeId};
