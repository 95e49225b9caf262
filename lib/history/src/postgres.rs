//! PostgreSQL history store.

use crate::error::HistoryError;
use crate::message::{Message, MessageRole};
use crate::store::{HistoryStore, ensure_persistable};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rootcause::Report;
use sqlx::migrate::MigrateError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::{debug, info, instrument};
use visage_core::ConversationId;

/// Row type for history queries.
#[derive(FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: i64,
    role: String,
    content: String,
    timestamp: DateTime<Utc>,
}

impl MessageRow {
    fn try_into_message(self) -> Result<Message, HistoryError> {
        let conversation_id = ConversationId::new(self.conversation_id);
        let role = MessageRole::from_str_value(&self.role).ok_or_else(|| {
            HistoryError::InvalidRow {
                conversation_id,
                reason: format!("unknown role '{}'", self.role),
            }
        })?;

        Ok(Message {
            id: self.id,
            conversation_id,
            role,
            content: self.content,
            timestamp: self.timestamp,
        })
    }
}

/// History store backed by the `chat_history` table.
///
/// Every operation checks a connection out of the pool for the duration of
/// a single statement; the pool returns it when the statement completes.
#[derive(Debug, Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool and verifies that the database answers.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::StoreUnavailable`] if no connection can be
    /// established within `acquire_timeout`.
    #[instrument(skip(options))]
    pub async fn connect(
        options: PgConnectOptions,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, Report<HistoryError>> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::StoreUnavailable {
                operation: "connect",
                reason: e.to_string(),
            })?;

        info!(max_connections, "connected to history database");
        Ok(Self::new(pool))
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    #[instrument(skip(self))]
    async fn init(&self) -> Result<(), Report<HistoryError>> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| match e {
                MigrateError::Execute(inner) => HistoryError::from_sqlx("init", &inner),
                other => HistoryError::QueryFailed {
                    operation: "init",
                    reason: other.to_string(),
                },
            })?;

        info!("history schema ready");
        Ok(())
    }

    #[instrument(skip(self, content), fields(conversation_id = %conversation_id, role = %role))]
    async fn append(
        &self,
        conversation_id: ConversationId,
        role: MessageRole,
        content: &str,
    ) -> Result<Message, Report<HistoryError>> {
        ensure_persistable(role)?;

        let row: MessageRow = sqlx::query_as(
            r#"
            INSERT INTO chat_history (conversation_id, role, content)
            VALUES ($1, $2, $3)
            RETURNING id, conversation_id, role, content, timestamp
            "#,
        )
        .bind(conversation_id.as_i64())
        .bind(role.as_str())
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| HistoryError::from_sqlx("append", &e))?;

        debug!(message_id = row.id, "appended history message");
        Ok(row.try_into_message()?)
    }

    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn get_all(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, Report<HistoryError>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, conversation_id, role, content, timestamp
            FROM chat_history
            WHERE conversation_id = $1
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(conversation_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::from_sqlx("get_all", &e))?;

        debug!(count = rows.len(), "loaded history");
        let messages = rows
            .into_iter()
            .map(MessageRow::try_into_message)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn delete_all(
        &self,
        conversation_id: ConversationId,
    ) -> Result<u64, Report<HistoryError>> {
        let result = sqlx::query("DELETE FROM chat_history WHERE conversation_id = $1")
            .bind(conversation_id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| HistoryError::from_sqlx("delete_all", &e))?;

        let removed = result.rows_affected();
        debug!(removed, "deleted history");
        Ok(removed)
    }
}
