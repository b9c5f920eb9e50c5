//! SQLite message repository implementation.
//!
//! Implements `MessageRepository` from `agora-core` using sqlx with split
//! read/write pools. Every save goes through a transaction on the writer
//! pool and assigns the authoritative `created_at` timestamp.

use chrono::{DateTime, Utc};
use sqlx::Row;

use agora_core::repository::MessageRepository;
use agora_types::error::RepositoryError;
use agora_types::message::{AuthorKind, ChatMessage, NewMessage};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_page(
        &self,
        channel_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM messages
               WHERE channel_id = ?
               ORDER BY created_at DESC, rowid DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(channel_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut msgs = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = ChatMessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            msgs.push(r.into_message()?);
        }
        // Queried newest-first for the LIMIT; callers want oldest -> newest.
        msgs.reverse();
        Ok(msgs)
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct ChatMessageRow {
    id: String,
    channel_id: String,
    user_id: String,
    user_name: String,
    user_type: String,
    content: String,
    timestamp: String,
    is_own_message: i64,
    created_at: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            channel_id: row.try_get("channel_id")?,
            user_id: row.try_get("user_id")?,
            user_name: row.try_get("user_name")?,
            user_type: row.try_get("user_type")?,
            content: row.try_get("content")?,
            timestamp: row.try_get("timestamp")?,
            is_own_message: row.try_get("is_own_message")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let user_type: AuthorKind = self
            .user_type
            .parse()
            .map_err(RepositoryError::Query)?;

        Ok(ChatMessage {
            id: self.id,
            channel_id: self.channel_id,
            user_id: self.user_id,
            user_name: self.user_name,
            user_type,
            content: self.content,
            timestamp: parse_datetime(&self.timestamp)?,
            is_own_message: self.is_own_message != 0,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a stored datetime. RFC 3339 is what this service writes; naive
/// `YYYY-MM-DDTHH:MM:SS[.f]` values (rows imported from older dumps) are
/// treated as UTC.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| RepositoryError::Query(format!("invalid datetime '{s}': {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// MessageRepository impl
// ---------------------------------------------------------------------------

impl MessageRepository for SqliteMessageRepository {
    async fn save_message(&self, msg: &NewMessage) -> Result<ChatMessage, RepositoryError> {
        let created_at = Utc::now();

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|_| RepositoryError::Connection)?;

        let result = sqlx::query(
            r#"INSERT INTO messages
               (id, channel_id, user_id, user_name, user_type, content,
                timestamp, is_own_message, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&msg.id)
        .bind(&msg.channel_id)
        .bind(&msg.user_id)
        .bind(&msg.user_name)
        .bind(msg.user_type.to_string())
        .bind(&msg.content)
        .bind(format_datetime(&msg.timestamp))
        .bind(msg.is_own_message as i64)
        .bind(format_datetime(&created_at))
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                return Err(RepositoryError::Conflict(format!(
                    "message '{}' already exists",
                    msg.id
                )));
            }
            Err(e) => return Err(RepositoryError::Query(e.to_string())),
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(ChatMessage {
            id: msg.id.clone(),
            channel_id: msg.channel_id.clone(),
            user_id: msg.user_id.clone(),
            user_name: msg.user_name.clone(),
            user_type: msg.user_type,
            content: msg.content.clone(),
            timestamp: msg.timestamp,
            is_own_message: msg.is_own_message,
            created_at,
        })
    }

    async fn recent_messages(
        &self,
        channel_id: &str,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.fetch_page(channel_id, 0, limit).await
    }

    async fn latest_message(
        &self,
        channel_id: &str,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT * FROM messages
               WHERE channel_id = ?
               ORDER BY created_at DESC, rowid DESC
               LIMIT 1"#,
        )
        .bind(channel_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = ChatMessageRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_message()?))
            }
            None => Ok(None),
        }
    }

    async fn channel_messages(
        &self,
        channel_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.fetch_page(channel_id, offset, limit).await
    }

    async fn count_messages(&self, channel_id: &str) -> Result<u64, RepositoryError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE channel_id = ?")
            .bind(channel_id)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(count.0 as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
