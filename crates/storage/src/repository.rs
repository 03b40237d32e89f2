use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use vocab_core::model::{
    DifficultyTag, EngineSettings, FinalizedSessionRecord, MasteryProgress, MasteryStatus,
    SessionType, VocabularyItem, WordId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── QUERY & UPDATE SHAPES ─────────────────────────────────────────────────────
//

/// Request shape for pulling a practice batch from the vocabulary source.
///
/// A response smaller than `word_count` is valid; an empty response means the
/// filters matched nothing and the caller reports that, it is not retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyQuery {
    pub session_type: SessionType,
    pub word_count: u32,
    pub difficulty: Option<DifficultyTag>,
    pub status: Option<MasteryStatus>,
    pub shuffle: bool,
}

/// One word's outcome pushed to the mastery update path after finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasteryUpdate {
    pub vocabulary_id: WordId,
    pub is_correct: bool,
    pub attempts: u32,
    pub time_spent_seconds: u32,
}

//
// ─── PORTS ─────────────────────────────────────────────────────────────────────
//

/// Repository contract for the vocabulary source and mastery bookkeeping.
#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    /// Fetch up to `word_count` items matching the query filters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. An empty result is not an
    /// error at this layer.
    async fn fetch_batch(&self, query: &VocabularyQuery)
    -> Result<Vec<VocabularyItem>, StorageError>;

    /// Fetch one item by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_item(&self, id: WordId) -> Result<VocabularyItem, StorageError>;

    /// Persist or update an item (mastery counters are preserved on update).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the item cannot be stored.
    async fn upsert_item(&self, item: &VocabularyItem) -> Result<(), StorageError>;

    /// Current mastery counters for an item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item is missing.
    async fn mastery(&self, id: WordId) -> Result<MasteryProgress, StorageError>;

    /// Fold one practice result into an item's mastery counters.
    ///
    /// Read-modify-write of the weighted running average; the returned value
    /// is the state now on disk. Status never downgrades on this path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item is missing.
    async fn apply_mastery(
        &self,
        update: &MasteryUpdate,
        settings: &EngineSettings,
    ) -> Result<MasteryProgress, StorageError>;

    /// Store the next scheduled review time for an item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item is missing.
    async fn set_next_review(&self, id: WordId, at: DateTime<Utc>) -> Result<(), StorageError>;
}

/// Append-only store of finalized session records.
#[async_trait]
pub trait SessionRecordRepository: Send + Sync {
    /// Append a finalized record, returning its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn append_record(&self, record: &FinalizedSessionRecord) -> Result<i64, StorageError>;

    /// Fetch one record by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_record(&self, id: i64) -> Result<FinalizedSessionRecord, StorageError>;

    /// List records, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_records(&self, limit: u32) -> Result<Vec<FinalizedSessionRecord>, StorageError>;

    /// Full history, oldest first. Aggregation input.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_all_records(&self) -> Result<Vec<FinalizedSessionRecord>, StorageError>;
}

/// Single-slot key-value port for the in-progress session snapshot.
///
/// Exactly one blob at a time; get/set/delete only, no partial updates.
/// Serialization happens above this port so the engine stays storage-agnostic.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Read the stored blob, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get(&self) -> Result<Option<String>, StorageError>;

    /// Overwrite the slot with a new blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn set(&self, blob: &str) -> Result<(), StorageError>;

    /// Delete the slot. Deleting an empty slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete(&self) -> Result<(), StorageError>;
}

/// Durable idempotency set of unlocked achievements.
#[async_trait]
pub trait AchievementStore: Send + Sync {
    /// Whether the rule with this id has ever been unlocked.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn is_unlocked(&self, id: &str) -> Result<bool, StorageError>;

    /// Record an unlock. Idempotent: unlocking twice keeps the first timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn unlock(&self, id: &str, at: DateTime<Utc>) -> Result<(), StorageError>;

    /// All unlocked rule ids.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn unlocked_ids(&self) -> Result<Vec<String>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct StoredWord {
    item: VocabularyItem,
    accuracy: u32,
    practice_count: u32,
    next_review_at: Option<DateTime<Utc>>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    words: Arc<Mutex<HashMap<WordId, StoredWord>>>,
    records: Arc<Mutex<Vec<FinalizedSessionRecord>>>,
    progress: Arc<Mutex<Option<String>>>,
    achievements: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<T>(guard: std::sync::LockResult<T>) -> Result<T, StorageError> {
        guard.map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Stored next-review timestamp for a word, for assertions in tests.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the word is missing.
    pub fn next_review_at(&self, id: WordId) -> Result<Option<DateTime<Utc>>, StorageError> {
        let guard = Self::lock(self.words.lock())?;
        guard
            .get(&id)
            .map(|w| w.next_review_at)
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl VocabularyRepository for InMemoryRepository {
    async fn fetch_batch(
        &self,
        query: &VocabularyQuery,
    ) -> Result<Vec<VocabularyItem>, StorageError> {
        let guard = Self::lock(self.words.lock())?;
        // Deterministic id order stands in for server-side shuffling.
        let mut matching: Vec<&StoredWord> = guard
            .values()
            .filter(|w| {
                query
                    .difficulty
                    .is_none_or(|d| w.item.difficulty() == d)
                    && query.status.is_none_or(|s| w.item.status() == s)
            })
            .collect();
        matching.sort_by_key(|w| w.item.id());

        Ok(matching
            .into_iter()
            .take(usize::try_from(query.word_count).unwrap_or(usize::MAX))
            .map(|w| w.item.clone())
            .collect())
    }

    async fn get_item(&self, id: WordId) -> Result<VocabularyItem, StorageError> {
        let guard = Self::lock(self.words.lock())?;
        guard
            .get(&id)
            .map(|w| w.item.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn upsert_item(&self, item: &VocabularyItem) -> Result<(), StorageError> {
        let mut guard = Self::lock(self.words.lock())?;
        match guard.get_mut(&item.id()) {
            Some(existing) => existing.item = item.clone(),
            None => {
                guard.insert(
                    item.id(),
                    StoredWord {
                        item: item.clone(),
                        accuracy: 0,
                        practice_count: 0,
                        next_review_at: None,
                    },
                );
            }
        }
        Ok(())
    }

    async fn mastery(&self, id: WordId) -> Result<MasteryProgress, StorageError> {
        let guard = Self::lock(self.words.lock())?;
        let word = guard.get(&id).ok_or(StorageError::NotFound)?;
        MasteryProgress::from_persisted(word.accuracy, word.practice_count, word.item.status())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn apply_mastery(
        &self,
        update: &MasteryUpdate,
        settings: &EngineSettings,
    ) -> Result<MasteryProgress, StorageError> {
        let mut guard = Self::lock(self.words.lock())?;
        let word = guard
            .get_mut(&update.vocabulary_id)
            .ok_or(StorageError::NotFound)?;

        let progress =
            MasteryProgress::from_persisted(word.accuracy, word.practice_count, word.item.status())
                .map_err(|e| StorageError::Serialization(e.to_string()))?
                .record_result(
                    update.is_correct,
                    settings.mastery_accuracy_threshold(),
                    settings.mastery_min_attempts(),
                );

        word.accuracy = progress.accuracy();
        word.practice_count = progress.practice_count();
        word.item = VocabularyItem::new(
            word.item.id(),
            word.item.word(),
            word.item.translation(),
            word.item.definition().map(ToOwned::to_owned),
            word.item.example().map(ToOwned::to_owned),
            word.item.pronunciation().map(ToOwned::to_owned),
            word.item.difficulty(),
            progress.status(),
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok(progress)
    }

    async fn set_next_review(&self, id: WordId, at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut guard = Self::lock(self.words.lock())?;
        let word = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        word.next_review_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl SessionRecordRepository for InMemoryRepository {
    async fn append_record(&self, record: &FinalizedSessionRecord) -> Result<i64, StorageError> {
        let mut guard = Self::lock(self.records.lock())?;
        guard.push(record.clone());
        i64::try_from(guard.len()).map_err(|_| StorageError::Serialization("id overflow".into()))
    }

    async fn get_record(&self, id: i64) -> Result<FinalizedSessionRecord, StorageError> {
        let guard = Self::lock(self.records.lock())?;
        let index = usize::try_from(id.checked_sub(1).ok_or(StorageError::NotFound)?)
            .map_err(|_| StorageError::NotFound)?;
        guard.get(index).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_records(&self, limit: u32) -> Result<Vec<FinalizedSessionRecord>, StorageError> {
        let guard = Self::lock(self.records.lock())?;
        Ok(guard
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn list_all_records(&self) -> Result<Vec<FinalizedSessionRecord>, StorageError> {
        let guard = Self::lock(self.records.lock())?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl ProgressStore for InMemoryRepository {
    async fn get(&self) -> Result<Option<String>, StorageError> {
        let guard = Self::lock(self.progress.lock())?;
        Ok(guard.clone())
    }

    async fn set(&self, blob: &str) -> Result<(), StorageError> {
        let mut guard = Self::lock(self.progress.lock())?;
        *guard = Some(blob.to_owned());
        Ok(())
    }

    async fn delete(&self) -> Result<(), StorageError> {
        let mut guard = Self::lock(self.progress.lock())?;
        *guard = None;
        Ok(())
    }
}

#[async_trait]
impl AchievementStore for InMemoryRepository {
    async fn is_unlocked(&self, id: &str) -> Result<bool, StorageError> {
        let guard = Self::lock(self.achievements.lock())?;
        Ok(guard.contains_key(id))
    }

    async fn unlock(&self, id: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut guard = Self::lock(self.achievements.lock())?;
        guard.entry(id.to_owned()).or_insert(at);
        Ok(())
    }

    async fn unlocked_ids(&self) -> Result<Vec<String>, StorageError> {
        let guard = Self::lock(self.achievements.lock())?;
        let mut ids: Vec<String> = guard.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the engine's ports behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub vocabulary: Arc<dyn VocabularyRepository>,
    pub records: Arc<dyn SessionRecordRepository>,
    pub progress: Arc<dyn ProgressStore>,
    pub achievements: Arc<dyn AchievementStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let vocabulary: Arc<dyn VocabularyRepository> = Arc::new(repo.clone());
        let records: Arc<dyn SessionRecordRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressStore> = Arc::new(repo.clone());
        let achievements: Arc<dyn AchievementStore> = Arc::new(repo);
        Self {
            vocabulary,
            records,
            progress,
            achievements,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::model::{SessionType, WordResult};
    use vocab_core::time::fixed_now;

    fn build_item(id: u64, difficulty: DifficultyTag) -> VocabularyItem {
        VocabularyItem::new(
            WordId::new(id),
            format!("word-{id}"),
            format!("translation-{id}"),
            None,
            None,
            None,
            difficulty,
            MasteryStatus::New,
        )
        .unwrap()
    }

    fn build_record(score: u8) -> FinalizedSessionRecord {
        FinalizedSessionRecord::from_parts(
            SessionType::Flashcard,
            score,
            30,
            None,
            vec![WordResult {
                vocabulary_id: WordId::new(1),
                is_correct: score > 0,
                time_spent_seconds: 30,
                attempts: 1,
            }],
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_batch_filters_and_limits() {
        let repo = InMemoryRepository::new();
        for id in 1..=5 {
            repo.upsert_item(&build_item(id, DifficultyTag::Easy))
                .await
                .unwrap();
        }
        repo.upsert_item(&build_item(6, DifficultyTag::Hard))
            .await
            .unwrap();

        let query = VocabularyQuery {
            session_type: SessionType::Flashcard,
            word_count: 3,
            difficulty: Some(DifficultyTag::Easy),
            status: None,
            shuffle: false,
        };
        let batch = repo.fetch_batch(&query).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|i| i.difficulty() == DifficultyTag::Easy));

        let none = repo
            .fetch_batch(&VocabularyQuery {
                difficulty: Some(DifficultyTag::Medium),
                ..query
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn apply_mastery_promotes_and_persists() {
        let repo = InMemoryRepository::new();
        repo.upsert_item(&build_item(1, DifficultyTag::Easy))
            .await
            .unwrap();
        let settings = EngineSettings::default_engine();

        let update = MasteryUpdate {
            vocabulary_id: WordId::new(1),
            is_correct: true,
            attempts: 1,
            time_spent_seconds: 5,
        };
        repo.apply_mastery(&update, &settings).await.unwrap();
        repo.apply_mastery(&update, &settings).await.unwrap();
        let third = repo.apply_mastery(&update, &settings).await.unwrap();

        assert_eq!(third.accuracy(), 100);
        assert_eq!(third.practice_count(), 3);
        assert_eq!(third.status(), MasteryStatus::Mastered);

        let stored = repo.get_item(WordId::new(1)).await.unwrap();
        assert_eq!(stored.status(), MasteryStatus::Mastered);
    }

    #[tokio::test]
    async fn upsert_preserves_mastery_counters() {
        let repo = InMemoryRepository::new();
        let item = build_item(1, DifficultyTag::Easy);
        repo.upsert_item(&item).await.unwrap();

        let settings = EngineSettings::default_engine();
        repo.apply_mastery(
            &MasteryUpdate {
                vocabulary_id: WordId::new(1),
                is_correct: true,
                attempts: 1,
                time_spent_seconds: 5,
            },
            &settings,
        )
        .await
        .unwrap();

        repo.upsert_item(&repo.get_item(WordId::new(1)).await.unwrap())
            .await
            .unwrap();
        let mastery = repo.mastery(WordId::new(1)).await.unwrap();
        assert_eq!(mastery.practice_count(), 1);
    }

    #[tokio::test]
    async fn records_append_and_list_in_order() {
        let repo = InMemoryRepository::new();
        let first = repo.append_record(&build_record(50)).await.unwrap();
        let second = repo.append_record(&build_record(80)).await.unwrap();
        assert!(second > first);

        let newest_first = repo.list_records(10).await.unwrap();
        assert_eq!(newest_first.len(), 2);
        assert_eq!(newest_first[0].score(), 80);

        let oldest_first = repo.list_all_records().await.unwrap();
        assert_eq!(oldest_first[0].score(), 50);

        let fetched = repo.get_record(first).await.unwrap();
        assert_eq!(fetched.score(), 50);
        assert!(matches!(
            repo.get_record(99).await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn progress_slot_holds_one_blob() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.get().await.unwrap(), None);

        repo.set("first").await.unwrap();
        repo.set("second").await.unwrap();
        assert_eq!(repo.get().await.unwrap().as_deref(), Some("second"));

        repo.delete().await.unwrap();
        assert_eq!(repo.get().await.unwrap(), None);
        // deleting an empty slot is fine
        repo.delete().await.unwrap();
    }

    #[tokio::test]
    async fn achievement_unlock_is_idempotent() {
        let repo = InMemoryRepository::new();
        assert!(!repo.is_unlocked("first_session").await.unwrap());

        repo.unlock("first_session", fixed_now()).await.unwrap();
        repo.unlock("first_session", fixed_now() + chrono::Duration::days(1))
            .await
            .unwrap();

        assert!(repo.is_unlocked("first_session").await.unwrap());
        assert_eq!(repo.unlocked_ids().await.unwrap(), vec!["first_session"]);
    }
}
