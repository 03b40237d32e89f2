use std::collections::HashMap;

use sqlx::Row;

use vocab_core::model::{FinalizedSessionRecord, WordResult};

use super::{
    SqliteRepository,
    mapping::{
        difficulty_from_str, id_i64, ser, session_type_from_str, u8_from_i64, u32_from_i64,
        word_id_from_i64,
    },
};
use crate::repository::{SessionRecordRepository, StorageError};

fn map_word_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<(i64, WordResult), StorageError> {
    let record_id: i64 = row.try_get("record_id").map_err(ser)?;
    let vocabulary_id = word_id_from_i64(row.try_get::<i64, _>("vocabulary_id").map_err(ser)?)?;
    let is_correct: bool = row.try_get("is_correct").map_err(ser)?;
    let time_spent_seconds = u32_from_i64(
        "time_spent_seconds",
        row.try_get::<i64, _>("time_spent_seconds").map_err(ser)?,
    )?;
    let attempts = u32_from_i64("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?;

    Ok((
        record_id,
        WordResult {
            vocabulary_id,
            is_correct,
            time_spent_seconds,
            attempts,
        },
    ))
}

fn map_record_row(
    row: &sqlx::sqlite::SqliteRow,
    word_results: Vec<WordResult>,
) -> Result<FinalizedSessionRecord, StorageError> {
    let session_type = session_type_from_str(row.try_get::<&str, _>("session_type").map_err(ser)?)?;
    let score = u8_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let time_spent_seconds = u32_from_i64(
        "time_spent_seconds",
        row.try_get::<i64, _>("time_spent_seconds").map_err(ser)?,
    )?;
    let difficulty = row
        .try_get::<Option<&str>, _>("difficulty")
        .map_err(ser)?
        .map(difficulty_from_str)
        .transpose()?;
    let created_at = row.try_get("created_at").map_err(ser)?;

    FinalizedSessionRecord::from_persisted(
        session_type,
        score,
        time_spent_seconds,
        difficulty,
        word_results,
        created_at,
    )
    .map_err(ser)
}

impl SqliteRepository {
    async fn word_results_for(
        &self,
        record_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<WordResult>>, StorageError> {
        if record_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut sql = String::from(
            r"
                SELECT record_id, vocabulary_id, is_correct, time_spent_seconds, attempts
                FROM session_word_results
                WHERE record_id IN (
            ",
        );
        for i in 0..record_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(")\n ORDER BY record_id ASC, id ASC");

        let mut query = sqlx::query(&sql);
        for id in record_ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut grouped: HashMap<i64, Vec<WordResult>> = HashMap::new();
        for row in rows {
            let (record_id, result) = map_word_result_row(&row)?;
            grouped.entry(record_id).or_default().push(result);
        }
        Ok(grouped)
    }

    async fn assemble_records(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
    ) -> Result<Vec<FinalizedSessionRecord>, StorageError> {
        let ids: Vec<i64> = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id").map_err(ser))
            .collect::<Result<_, _>>()?;
        let mut results = self.word_results_for(&ids).await?;

        let mut out = Vec::with_capacity(rows.len());
        for (row, id) in rows.iter().zip(ids) {
            let word_results = results.remove(&id).unwrap_or_default();
            out.push(map_record_row(row, word_results)?);
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl SessionRecordRepository for SqliteRepository {
    async fn append_record(&self, record: &FinalizedSessionRecord) -> Result<i64, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = sqlx::query(
            r"
                INSERT INTO session_records (
                    session_type, score, time_spent_seconds, difficulty, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(record.session_type().as_str())
        .bind(i64::from(record.score()))
        .bind(i64::from(record.time_spent_seconds()))
        .bind(record.difficulty().map(|d| d.as_str()))
        .bind(record.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let record_id = res.last_insert_rowid();

        for result in record.word_results() {
            sqlx::query(
                r"
                    INSERT INTO session_word_results (
                        record_id, vocabulary_id, is_correct, time_spent_seconds, attempts
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(record_id)
            .bind(id_i64("vocabulary_id", result.vocabulary_id.value())?)
            .bind(result.is_correct)
            .bind(i64::from(result.time_spent_seconds))
            .bind(i64::from(result.attempts))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(record_id)
    }

    async fn get_record(&self, id: i64) -> Result<FinalizedSessionRecord, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, session_type, score, time_spent_seconds, difficulty, created_at
                FROM session_records
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        let mut results = self.word_results_for(&[id]).await?;
        map_record_row(&row, results.remove(&id).unwrap_or_default())
    }

    async fn list_records(&self, limit: u32) -> Result<Vec<FinalizedSessionRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, session_type, score, time_spent_seconds, difficulty, created_at
                FROM session_records
                ORDER BY created_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.assemble_records(rows).await
    }

    async fn list_all_records(&self) -> Result<Vec<FinalizedSessionRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, session_type, score, time_spent_seconds, difficulty, created_at
                FROM session_records
                ORDER BY created_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.assemble_records(rows).await
    }
}
