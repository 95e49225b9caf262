//! Bot configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested
//! sections use `__` as separator, e.g. `DATABASE__HOST` or
//! `COMPLETION__MODEL`.

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::time::Duration;
use visage_ai::CompletionConfig;
use visage_conversation::OrchestratorConfig;
use visage_core::Result;

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// The environment could not be read or deserialized.
    Load { details: String },
    /// A value was present but unusable.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { details } => write!(f, "failed to load configuration: {details}"),
            Self::Invalid { field, reason } => {
                write!(f, "invalid configuration value '{field}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level bot configuration.
#[derive(Deserialize)]
pub struct BotConfig {
    /// Telegram bot token (`BOT_API_TOKEN`).
    pub bot_api_token: String,

    /// Completion credential (`HF_TOKEN`). Used when `COMPLETION__API_KEY`
    /// is not set.
    #[serde(default)]
    pub hf_token: Option<String>,

    /// Completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// PostgreSQL settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Where history is kept.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Long-polling settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Replaces the built-in persona.
    #[serde(default)]
    pub system_instruction: Option<String>,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_api_token", &"<redacted>")
            .field("hf_token", &self.hf_token.as_ref().map(|_| "<redacted>"))
            .field("completion", &self.completion)
            .field("database", &self.database)
            .field("storage", &self.storage)
            .field("polling", &self.polling)
            .field("system_instruction", &self.system_instruction.is_some())
            .finish()
    }
}

/// Database connection settings.
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Database name.
    #[serde(default = "default_db_name")]
    pub name: String,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default)]
    pub password: Option<String>,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long to wait for a pooled connection.
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5433
}

fn default_db_name() -> String {
    "postgres".to_string()
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_seconds() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            name: default_db_name(),
            user: default_db_user(),
            password: None,
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout_seconds(),
        }
    }
}

impl DatabaseConfig {
    /// Builds sqlx connection options.
    #[must_use]
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user);
        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }

    /// Returns the pool acquire timeout.
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_seconds", &self.acquire_timeout_seconds)
            .finish()
    }
}

/// History storage backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// PostgreSQL `chat_history` table.
    #[default]
    Postgres,
    /// Process memory; history is lost on restart.
    Memory,
}

/// Storage settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

/// Long-polling settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// `getUpdates` long-poll timeout.
    #[serde(default = "default_poll_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Pause after a failed `getUpdates` call.
    #[serde(default = "default_error_pause_seconds")]
    pub error_pause_seconds: u64,
}

fn default_poll_timeout_seconds() -> u64 {
    30
}

fn default_error_pause_seconds() -> u64 {
    5
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_poll_timeout_seconds(),
            error_pause_seconds: default_error_pause_seconds(),
        }
    }
}

impl BotConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `BOT_API_TOKEN` is missing or empty, or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(environment())
    }

    fn from_source(source: config::Environment) -> Result<Self, ConfigError> {
        let mut loaded: Self = config::Config::builder()
            .add_source(source)
            .build()
            .and_then(config::Config::try_deserialize::<Self>)
            .map_err(|e| ConfigError::Load {
                details: e.to_string(),
            })?;

        if loaded.bot_api_token.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "BOT_API_TOKEN",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if loaded.completion.api_key.is_none() {
            loaded.completion.api_key = loaded.hf_token.clone();
        }
        Ok(loaded)
    }

    /// Orchestrator settings derived from this configuration.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let config = OrchestratorConfig::default()
            .with_max_tokens(self.completion.max_tokens)
            .with_temperature(self.completion.temperature);
        match self
            .system_instruction
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(instruction) => config.with_system_instruction(instruction),
            None => config,
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::default()
        .separator("__")
        .try_parsing(true)
}
