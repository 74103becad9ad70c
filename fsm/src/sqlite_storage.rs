//! SQLite-backed state store: one row per conversation, data kept as JSON text.
//!
//! External: SQLite via sqlx. Same contract as [`MemoryStorage`](crate::MemoryStorage), but state survives restarts.

use async_trait::async_trait;
use log::info;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use vkbot_core::{BotError, ConversationId, Result, StateData};

use crate::storage::Storage;

fn storage_err(e: sqlx::Error) -> BotError {
    BotError::Storage(e.to_string())
}

#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Opens (creating if missing) the database file at `path` and ensures the table exists.
    pub async fn new(path: &str) -> Result<Self> {
        info!("Opening FSM SQLite store: {}", path);

        let options = SqliteConnectOptions::new()
            .create_if_missing(true)
            .filename(path);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.init().await?;
        Ok(storage)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fsm_states (
                conversation_id INTEGER PRIMARY KEY,
                state TEXT,
                data TEXT NOT NULL DEFAULT '{}'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    /// Number of conversations with a stored row.
    pub async fn len(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM fsm_states")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get_state(&self, conversation_id: ConversationId) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT state FROM fsm_states WHERE conversation_id = ?")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?;
        Ok(row.and_then(|(state,)| state))
    }

    async fn set_state(
        &self,
        conversation_id: ConversationId,
        state: Option<String>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fsm_states (conversation_id, state) VALUES (?, ?)
            ON CONFLICT(conversation_id) DO UPDATE SET state = excluded.state
            "#,
        )
        .bind(conversation_id)
        .bind(state)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_data(&self, conversation_id: ConversationId) -> Result<StateData> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM fsm_states WHERE conversation_id = ?")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?;
        match row {
            Some((json,)) => Ok(serde_json::from_str(&json)?),
            None => Ok(StateData::new()),
        }
    }

    async fn set_data(&self, conversation_id: ConversationId, data: StateData) -> Result<()> {
        let json = serde_json::to_string(&data)?;
        sqlx::query(
            r#"
            INSERT INTO fsm_states (conversation_id, data) VALUES (?, ?)
            ON CONFLICT(conversation_id) DO UPDATE SET data = excluded.data
            "#,
        )
        .bind(conversation_id)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}
