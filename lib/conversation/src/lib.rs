//! Message orchestration for visage.
//!
//! This crate provides:
//!
//! - **Orchestrator**: records the user turn, asks the completion service
//!   for a reply over the full history, and records the reply
//! - **ConversationLocks**: per-conversation serialization so that one
//!   conversation's exchanges never interleave

pub mod config;
pub mod locks;
pub mod orchestrator;

pub use config::{DEFAULT_FAILURE_MESSAGE, OrchestratorConfig};
pub use locks::{ConversationGuard, ConversationLocks};
pub use orchestrator::{Orchestrator, Reply, ReplyOutcome};
