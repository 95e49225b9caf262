//! Shared `Result` alias.
//!
//! Errors are typed per crate (`HistoryError`, `LlmError`, ...) and travel
//! inside a [`Report`], which keeps the chain of causes for logging.

use rootcause::Report;

/// Result carrying a [`Report`] of context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
