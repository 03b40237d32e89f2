use std::sync::{Arc, Mutex};

use chrono::{FixedOffset, Offset, Utc};

use storage::repository::SessionRecordRepository;
use vocab_core::Clock;
use vocab_core::stats::{PracticeStatistics, compute_stats};

use crate::error::SessionError;

//
// ─── CACHE PORT ────────────────────────────────────────────────────────────────
//

/// Cached aggregate views over the session history.
///
/// A collaborator, not owned by the engine: the finalizer invalidates it
/// after every durable write so readers never see a stale streak.
pub trait StatsCache: Send + Sync {
    fn get(&self) -> Option<PracticeStatistics>;
    fn put(&self, stats: &PracticeStatistics);
    fn invalidate(&self);
}

/// Process-local cache slot.
#[derive(Default)]
pub struct InMemoryStatsCache {
    slot: Mutex<Option<PracticeStatistics>>,
}

impl InMemoryStatsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsCache for InMemoryStatsCache {
    fn get(&self) -> Option<PracticeStatistics> {
        self.slot.lock().ok().and_then(|guard| guard.clone())
    }

    fn put(&self, stats: &PracticeStatistics) {
        if let Ok(mut guard) = self.slot.lock() {
            *guard = Some(stats.clone());
        }
    }

    fn invalidate(&self) {
        if let Ok(mut guard) = self.slot.lock() {
            *guard = None;
        }
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Serves aggregate statistics over the finalized-session history.
///
/// Streak days are calendar days in the configured UTC offset; the default
/// offset is UTC and clients pass their local offset so "a session today"
/// means the user's today.
pub struct StatisticsService {
    clock: Clock,
    records: Arc<dyn SessionRecordRepository>,
    cache: Arc<dyn StatsCache>,
    utc_offset: FixedOffset,
}

impl StatisticsService {
    #[must_use]
    pub fn new(
        clock: Clock,
        records: Arc<dyn SessionRecordRepository>,
        cache: Arc<dyn StatsCache>,
    ) -> Self {
        Self {
            clock,
            records,
            cache,
            utc_offset: Utc.fix(),
        }
    }

    /// Use this UTC offset for day-boundary computation.
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Current statistics, served from cache when warm.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the history cannot be read.
    pub async fn current_stats(&self) -> Result<PracticeStatistics, SessionError> {
        if let Some(cached) = self.cache.get() {
            return Ok(cached);
        }
        self.refresh().await
    }

    /// Recompute from the full history, repopulating the cache.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the history cannot be read.
    pub async fn refresh(&self) -> Result<PracticeStatistics, SessionError> {
        let history = self.records.list_all_records().await?;
        let today = self.clock.today_in(&self.utc_offset);
        let stats = compute_stats(&history, &self.utc_offset, today);
        self.cache.put(&stats);
        Ok(stats)
    }

    /// Drop the cached aggregate so the next read recomputes.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
