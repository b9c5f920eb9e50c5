//! SQLite channel repository implementation.

use agora_core::repository::ChannelRepository;
use agora_types::error::RepositoryError;
use agora_types::message::Channel;
use sqlx::Row;

use super::message::{format_datetime, parse_datetime};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChannelRepository`.
pub struct SqliteChannelRepository {
    pool: DatabasePool,
}

impl SqliteChannelRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn channel_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Channel, RepositoryError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let description: Option<String> = row
        .try_get("description")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(Channel {
        id,
        name,
        description,
        created_at: parse_datetime(&created_at)?,
    })
}

impl ChannelRepository for SqliteChannelRepository {
    async fn list_channels(&self) -> Result<Vec<Channel>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM channels ORDER BY id ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(channel_from_row).collect()
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM channels WHERE id = ?")
            .bind(channel_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(channel_from_row).transpose()
    }

    async fn seed_channels(&self, channels: &[Channel]) -> Result<(), RepositoryError> {
        for channel in channels {
            sqlx::query(
                "INSERT OR IGNORE INTO channels (id, name, description, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&channel.id)
            .bind(&channel.name)
            .bind(&channel.description)
            .bind(format_datetime(&channel.created_at))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::DatabasePool;
    use chrono::Utc;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn make_channel(id: &str, name: &str) -> Channel {
        Channel {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(format!("the {name} channel")),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_seed_then_list_and_get() {
        let repo = SqliteChannelRepository::new(test_pool().await);
        repo.seed_channels(&[make_channel("2", "random"), make_channel("1", "general")])
            .await
            .unwrap();

        let channels = repo.list_channels().await.unwrap();
        let ids: Vec<&str> = channels.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let general = repo.get_channel("1").await.unwrap().unwrap();
        assert_eq!(general.name, "general");
        assert!(repo.get_channel("99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seed_leaves_existing_rows_untouched() {
        let repo = SqliteChannelRepository::new(test_pool().await);
        repo.seed_channels(&[make_channel("1", "general")]).await.unwrap();
        // A second seed with a different name must not overwrite.
        repo.seed_channels(&[make_channel("1", "renamed")]).await.unwrap();

        let channel = repo.get_channel("1").await.unwrap().unwrap();
        assert_eq!(channel.name, "general");
    }
}
