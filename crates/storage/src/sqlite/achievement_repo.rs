use chrono::{DateTime, Utc};
use sqlx::Row;

use super::{SqliteRepository, mapping::ser};
use crate::repository::{AchievementStore, StorageError};

#[async_trait::async_trait]
impl AchievementStore for SqliteRepository {
    async fn is_unlocked(&self, id: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM achievements_unlocked WHERE achievement_id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn unlock(&self, id: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        // First unlock wins; replays keep the original timestamp.
        sqlx::query(
            r"
                INSERT INTO achievements_unlocked (achievement_id, unlocked_at)
                VALUES (?1, ?2)
                ON CONFLICT(achievement_id) DO NOTHING
            ",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn unlocked_ids(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT achievement_id
                FROM achievements_unlocked
                ORDER BY achievement_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("achievement_id").map_err(ser))
            .collect()
    }
}
