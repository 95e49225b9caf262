//! Orchestrator configuration.

use visage_ai::{DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM_INSTRUCTION};

/// Reply sent when the completion service fails. Never stored in history.
pub const DEFAULT_FAILURE_MESSAGE: &str = "К сожалению, произошла техническая неполадка при \
обращении к AI-модели. Пожалуйста, попробуйте снова через минуту.";

/// Settings fixed for the lifetime of an [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Instruction prepended to every model call.
    pub system_instruction: String,
    /// Output budget per reply.
    pub max_tokens: u32,
    /// Sampling temperature; `None` keeps the provider default.
    pub temperature: Option<f32>,
    /// Text returned to the user when no reply could be produced.
    pub failure_message: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Replaces the system instruction.
    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replaces the failure message.
    #[must_use]
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }
}
