use chrono::{DateTime, Utc};
use sqlx::Row;

use vocab_core::model::{
    EngineSettings, MasteryProgress, VocabularyItem, WordId,
};

use super::{
    SqliteRepository,
    mapping::{difficulty_from_str, id_i64, ser, status_from_str, u32_from_i64, word_id_from_i64},
};
use crate::repository::{MasteryUpdate, StorageError, VocabularyQuery, VocabularyRepository};

fn map_item_row(row: &sqlx::sqlite::SqliteRow) -> Result<VocabularyItem, StorageError> {
    let id = word_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let word: String = row.try_get("word").map_err(ser)?;
    let translation: String = row.try_get("translation").map_err(ser)?;
    let definition: Option<String> = row.try_get("definition").map_err(ser)?;
    let example: Option<String> = row.try_get("example").map_err(ser)?;
    let pronunciation: Option<String> = row.try_get("pronunciation").map_err(ser)?;
    let difficulty = difficulty_from_str(row.try_get::<&str, _>("difficulty").map_err(ser)?)?;
    let status = status_from_str(row.try_get::<&str, _>("status").map_err(ser)?)?;

    VocabularyItem::new(
        id,
        word,
        translation,
        definition,
        example,
        pronunciation,
        difficulty,
        status,
    )
    .map_err(ser)
}

fn map_mastery_row(row: &sqlx::sqlite::SqliteRow) -> Result<MasteryProgress, StorageError> {
    let accuracy = u32_from_i64("accuracy", row.try_get::<i64, _>("accuracy").map_err(ser)?)?;
    let practice_count = u32_from_i64(
        "practice_count",
        row.try_get::<i64, _>("practice_count").map_err(ser)?,
    )?;
    let status = status_from_str(row.try_get::<&str, _>("status").map_err(ser)?)?;
    MasteryProgress::from_persisted(accuracy, practice_count, status).map_err(ser)
}

#[async_trait::async_trait]
impl VocabularyRepository for SqliteRepository {
    async fn fetch_batch(
        &self,
        query: &VocabularyQuery,
    ) -> Result<Vec<VocabularyItem>, StorageError> {
        let mut sql = String::from(
            r"
                SELECT id, word, translation, definition, example, pronunciation,
                       difficulty, status
                FROM vocabulary_items
                WHERE 1 = 1
            ",
        );

        let mut bind_index = 1;
        if query.difficulty.is_some() {
            sql.push_str(" AND difficulty = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if query.status.is_some() {
            sql.push_str(" AND status = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if query.shuffle {
            sql.push_str(" ORDER BY RANDOM()");
        } else {
            sql.push_str(" ORDER BY id ASC");
        }
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut q = sqlx::query(&sql);
        if let Some(difficulty) = query.difficulty {
            q = q.bind(difficulty.as_str());
        }
        if let Some(status) = query.status {
            q = q.bind(status.as_str());
        }
        q = q.bind(i64::from(query.word_count));

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_item_row(&row)?);
        }
        Ok(out)
    }

    async fn get_item(&self, id: WordId) -> Result<VocabularyItem, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, word, translation, definition, example, pronunciation,
                       difficulty, status
                FROM vocabulary_items
                WHERE id = ?1
            ",
        )
        .bind(id_i64("id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_item_row(&row)
    }

    async fn upsert_item(&self, item: &VocabularyItem) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO vocabulary_items (
                    id, word, translation, definition, example, pronunciation,
                    difficulty, status, accuracy, practice_count, next_review_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, NULL)
                ON CONFLICT(id) DO UPDATE SET
                    word = excluded.word,
                    translation = excluded.translation,
                    definition = excluded.definition,
                    example = excluded.example,
                    pronunciation = excluded.pronunciation,
                    difficulty = excluded.difficulty,
                    status = excluded.status
            ",
        )
        .bind(id_i64("id", item.id().value())?)
        .bind(item.word())
        .bind(item.translation())
        .bind(item.definition())
        .bind(item.example())
        .bind(item.pronunciation())
        .bind(item.difficulty().as_str())
        .bind(item.status().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn mastery(&self, id: WordId) -> Result<MasteryProgress, StorageError> {
        let row = sqlx::query(
            r"
                SELECT accuracy, practice_count, status
                FROM vocabulary_items
                WHERE id = ?1
            ",
        )
        .bind(id_i64("id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_mastery_row(&row)
    }

    async fn apply_mastery(
        &self,
        update: &MasteryUpdate,
        settings: &EngineSettings,
    ) -> Result<MasteryProgress, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let row = sqlx::query(
            r"
                SELECT accuracy, practice_count, status
                FROM vocabulary_items
                WHERE id = ?1
            ",
        )
        .bind(id_i64("id", update.vocabulary_id.value())?)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        let progress = map_mastery_row(&row)?.record_result(
            update.is_correct,
            settings.mastery_accuracy_threshold(),
            settings.mastery_min_attempts(),
        );

        sqlx::query(
            r"
                UPDATE vocabulary_items
                SET accuracy = ?1, practice_count = ?2, status = ?3
                WHERE id = ?4
            ",
        )
        .bind(i64::from(progress.accuracy()))
        .bind(i64::from(progress.practice_count()))
        .bind(progress.status().as_str())
        .bind(id_i64("id", update.vocabulary_id.value())?)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(progress)
    }

    async fn set_next_review(&self, id: WordId, at: DateTime<Utc>) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
                UPDATE vocabulary_items
                SET next_review_at = ?1
                WHERE id = ?2
            ",
        )
        .bind(at)
        .bind(id_i64("id", id.value())?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
