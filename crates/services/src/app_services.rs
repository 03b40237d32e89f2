use std::sync::Arc;

use storage::repository::Storage;

use crate::achievement_service::AchievementService;
use crate::error::AppServicesError;
use crate::sessions::PracticeLoopService;
use crate::stats_service::{InMemoryStatsCache, StatisticsService};
use crate::sync::SyncClient;
use crate::Clock;

/// Assembles app-facing services over a storage backend.
#[derive(Clone)]
pub struct PracticeServices {
    practice_loop: Arc<PracticeLoopService>,
    statistics: Arc<StatisticsService>,
    achievements: Arc<AchievementService>,
    sync: Arc<SyncClient>,
}

impl PracticeServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock))
    }

    /// Build services over in-memory storage, for tests and prototyping.
    #[must_use]
    pub fn new_in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    fn from_storage(storage: Storage, clock: Clock) -> Self {
        let statistics = Arc::new(StatisticsService::new(
            clock,
            Arc::clone(&storage.records),
            Arc::new(InMemoryStatsCache::new()),
        ));
        let achievements = Arc::new(AchievementService::new(Arc::clone(&storage.achievements)));
        let practice_loop = Arc::new(PracticeLoopService::new(
            clock,
            Arc::clone(&storage.vocabulary),
            Arc::clone(&storage.records),
            Arc::clone(&storage.progress),
            Arc::clone(&statistics),
            Arc::clone(&achievements),
        ));
        let sync = Arc::new(SyncClient::from_env());

        Self {
            practice_loop,
            statistics,
            achievements,
            sync,
        }
    }

    #[must_use]
    pub fn practice_loop(&self) -> Arc<PracticeLoopService> {
        Arc::clone(&self.practice_loop)
    }

    #[must_use]
    pub fn statistics(&self) -> Arc<StatisticsService> {
        Arc::clone(&self.statistics)
    }

    #[must_use]
    pub fn achievements(&self) -> Arc<AchievementService> {
        Arc::clone(&self.achievements)
    }

    #[must_use]
    pub fn sync(&self) -> Arc<SyncClient> {
        Arc::clone(&self.sync)
    }
}
