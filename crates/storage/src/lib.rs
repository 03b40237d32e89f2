#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AchievementStore, InMemoryRepository, MasteryUpdate, ProgressStore, SessionRecordRepository,
    Storage, StorageError, VocabularyQuery, VocabularyRepository,
};
