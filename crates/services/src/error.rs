//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use vocab_core::model::RecordError;

/// Errors emitted by session services.
///
/// Best-effort autosave failures are deliberately absent: interim snapshot
/// I/O problems are logged and swallowed so progress loss degrades gracefully
/// instead of crashing a session. Finalize and mastery writes do surface
/// through `Storage`, since losing those is a correctness issue.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no vocabulary items match the requested filters")]
    EmptyPool,

    #[error("a practice session is already active; reset it first")]
    AlreadyActive,

    #[error("no active practice session")]
    NoActiveSession,

    #[error("session is not complete")]
    NotComplete,

    #[error("a finalize for this session is already in flight")]
    FinalizeInFlight,

    #[error("word count {provided} is below the minimum of {min}")]
    WordCountTooSmall { provided: u32, min: u32 },

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Snapshot(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SyncClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("remote sync is not configured")]
    Disabled,

    #[error("sync request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
