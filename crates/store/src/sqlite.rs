//! SQLite chat store.
//!
//! One row per chat; the ordered turn log is stored as a JSON array so a
//! commit is a single atomic upsert of the whole sequence.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::error::StoreError;
use parley_core::store::ChatStore;
use parley_core::turn::{Chat, ConversationId, Turn};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// A SQLite-backed chat store.
pub struct SqliteChatStore {
    pool: SqlitePool,
}

impl SqliteChatStore {
    /// Open (or create) a database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Storage(format!("Failed to create chat directory: {e}"))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite chat store initialized at {}", path.display());
        Ok(store)
    }

    /// An ephemeral in-process database (useful for tests).
    ///
    /// Limited to one connection: every `:memory:` connection is its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                id          TEXT PRIMARY KEY NOT NULL,
                title       TEXT NOT NULL,
                path        TEXT NOT NULL,
                user_id     TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                is_shared   INTEGER NOT NULL DEFAULT 0,
                turns       TEXT NOT NULL DEFAULT '[]'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("chats table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chats_created_at ON chats(created_at DESC)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("created_at index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse a `Chat` from a SQLite row.
    fn row_to_chat(row: &sqlx::sqlite::SqliteRow) -> Result<Chat, StoreError> {
        let column = |name: &str, e: sqlx::Error| StoreError::Storage(format!("{name} column: {e}"));

        let id: String = row.try_get("id").map_err(|e| column("id", e))?;
        let title: String = row.try_get("title").map_err(|e| column("title", e))?;
        let path: String = row.try_get("path").map_err(|e| column("path", e))?;
        let user_id: String = row.try_get("user_id").map_err(|e| column("user_id", e))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| column("created_at", e))?;
        let is_shared: bool = row
            .try_get("is_shared")
            .map_err(|e| column("is_shared", e))?;
        let turns_json: String = row.try_get("turns").map_err(|e| column("turns", e))?;

        let turns: Vec<Turn> =
            serde_json::from_str(&turns_json).map_err(|e| StoreError::Serialization {
                chat_id: id.clone(),
                reason: e.to_string(),
            })?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Chat {
            id: ConversationId(id),
            title,
            path,
            user_id,
            created_at,
            turns,
            is_shared,
        })
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn save(&self, chat: &Chat) -> Result<(), StoreError> {
        let turns_json = serde_json::to_string(&chat.turns).map_err(|e| {
            StoreError::Serialization {
                chat_id: chat.id.to_string(),
                reason: e.to_string(),
            }
        })?;

        sqlx::query(
            r#"
            INSERT INTO chats (id, title, path, user_id, created_at, updated_at, is_shared, turns)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                path = excluded.path,
                user_id = excluded.user_id,
                updated_at = excluded.updated_at,
                is_shared = excluded.is_shared,
                turns = excluded.turns
            "#,
        )
        .bind(chat.id.as_str())
        .bind(&chat.title)
        .bind(&chat.path)
        .bind(&chat.user_id)
        .bind(chat.created_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(chat.is_shared)
        .bind(&turns_json)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT failed: {e}")))?;

        debug!(chat_id = %chat.id, turns = chat.turns.len(), "Saved chat");
        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Chat>, StoreError> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("GET by ID: {e}")))?;

        row.as_ref().map(Self::row_to_chat).transpose()
    }

    async fn list(&self, limit: usize) -> Result<Vec<Chat>, StoreError> {
        let rows = sqlx::query("SELECT * FROM chats ORDER BY created_at DESC LIMIT ?1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("LIST: {e}")))?;

        rows.iter().map(Self::row_to_chat).collect()
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM chats WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM chats")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::Storage(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}
