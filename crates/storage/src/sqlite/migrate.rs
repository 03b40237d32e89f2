use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (vocabulary items with mastery counters, finalized
/// session records with per-word results, the progress slot, the achievement
/// unlock set, and indexes).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS vocabulary_items (
                    id INTEGER PRIMARY KEY,
                    word TEXT NOT NULL,
                    translation TEXT NOT NULL,
                    definition TEXT,
                    example TEXT,
                    pronunciation TEXT,
                    difficulty TEXT NOT NULL,
                    status TEXT NOT NULL,
                    accuracy INTEGER NOT NULL CHECK (accuracy BETWEEN 0 AND 100),
                    practice_count INTEGER NOT NULL CHECK (practice_count >= 0),
                    next_review_at TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_records (
                    id INTEGER PRIMARY KEY,
                    session_type TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
                    time_spent_seconds INTEGER NOT NULL CHECK (time_spent_seconds >= 0),
                    difficulty TEXT,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_word_results (
                    id INTEGER PRIMARY KEY,
                    record_id INTEGER NOT NULL,
                    vocabulary_id INTEGER NOT NULL,
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    time_spent_seconds INTEGER NOT NULL CHECK (time_spent_seconds >= 0),
                    attempts INTEGER NOT NULL CHECK (attempts >= 0),
                    FOREIGN KEY (record_id) REFERENCES session_records(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress_slot (
                    slot INTEGER PRIMARY KEY CHECK (slot = 1),
                    blob TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS achievements_unlocked (
                    achievement_id TEXT PRIMARY KEY,
                    unlocked_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_vocabulary_status_difficulty
                    ON vocabulary_items(status, difficulty);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_session_records_created
                    ON session_records(created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_word_results_record
                    ON session_word_results(record_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
