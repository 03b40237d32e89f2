use chrono::Utc;
use sqlx::Row;

use super::{SqliteRepository, mapping::ser};
use crate::repository::{ProgressStore, StorageError};

// The slot column is constrained to 1, so the table holds at most one row.
const SLOT: i64 = 1;

#[async_trait::async_trait]
impl ProgressStore for SqliteRepository {
    async fn get(&self) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT blob FROM progress_slot WHERE slot = ?1")
            .bind(SLOT)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| r.try_get::<String, _>("blob").map_err(ser))
            .transpose()
    }

    async fn set(&self, blob: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO progress_slot (slot, blob, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(slot) DO UPDATE SET
                    blob = excluded.blob,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(SLOT)
        .bind(blob)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM progress_slot WHERE slot = ?1")
            .bind(SLOT)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
