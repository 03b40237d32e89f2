use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{
    AchievementStore, ProgressStore, SessionRecordRepository, Storage, VocabularyRepository,
};

mod achievement_repo;
mod mapping;
mod migrate;
mod progress_repo;
mod session_record_repo;
mod vocabulary_repo;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

// Applied to every pooled connection before it is handed out.
const CONNECTION_PRAGMAS: [&str; 3] = [
    "PRAGMA foreign_keys = ON;",
    "PRAGMA journal_mode = WAL;",
    "PRAGMA busy_timeout = 5000;",
];

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// applying the session PRAGMAs fails during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for pragma in CONNECTION_PRAGMAS {
                        sqlx::query(pragma).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let vocabulary: Arc<dyn VocabularyRepository> = Arc::new(repo.clone());
        let records: Arc<dyn SessionRecordRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressStore> = Arc::new(repo.clone());
        let achievements: Arc<dyn AchievementStore> = Arc::new(repo);
        Ok(Self {
            vocabulary,
            records,
            progress,
            achievements,
        })
    }
}
