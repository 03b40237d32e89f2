use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rand::rng;
use rand::seq::SliceRandom;
use tracing::debug;

use storage::repository::{
    MasteryUpdate, ProgressStore, SessionRecordRepository, StorageError, VocabularyQuery,
    VocabularyRepository,
};
use vocab_core::Clock;
use vocab_core::model::{
    EngineSettings, FinalizedSessionRecord, SessionType, WordId,
};
use vocab_core::stats::PracticeStatistics;

use super::progress::SessionProgress;
use super::service::{Answer, PracticeSession, SessionConfig};
use super::snapshot::SnapshotKeeper;
use crate::achievement_service::{AchievementService, UnlockedAchievement};
use crate::error::SessionError;
use crate::stats_service::StatisticsService;

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Result of submitting one answer through the loop service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnswerResult {
    /// False when the submission was rejected (paused or already complete).
    pub accepted: bool,
    /// True iff this answer completed the session; the caller's signal to
    /// finalize.
    pub completed_session: bool,
    pub progress: SessionProgress,
}

/// What a timer tick observed and did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub saved: bool,
    pub time_limit_exceeded: bool,
}

/// Everything produced by a successful finalize.
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    pub record_id: i64,
    pub record: FinalizedSessionRecord,
    pub stats: PracticeStatistics,
    pub newly_unlocked: Vec<UnlockedAchievement>,
}

enum Prepared {
    AlreadyRecorded(i64),
    NothingAttempted,
    Ready {
        record: FinalizedSessionRecord,
        updates: Vec<MasteryUpdate>,
        schedule: Vec<(WordId, DateTime<Utc>)>,
    },
}

//
// ─── LOOP SERVICE ──────────────────────────────────────────────────────────────
//

/// Owns the active session and orchestrates the full practice loop: start,
/// answer, pause, autosave ticks, finalize, and resume.
///
/// All mutation funnels through one internal mutex, so a submit+autosave pair
/// can never interleave with another mutation even when timers re-enter.
/// Timer callbacks arrive as [`tick`](Self::tick) events and no-op once the
/// session is complete or gone.
pub struct PracticeLoopService {
    clock: Clock,
    settings: EngineSettings,
    vocabulary: Arc<dyn VocabularyRepository>,
    records: Arc<dyn SessionRecordRepository>,
    statistics: Arc<StatisticsService>,
    achievements: Arc<AchievementService>,
    progress_store: Arc<dyn ProgressStore>,
    snapshots: SnapshotKeeper,
    active: Mutex<Option<PracticeSession>>,
    finalize_in_flight: AtomicBool,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        vocabulary: Arc<dyn VocabularyRepository>,
        records: Arc<dyn SessionRecordRepository>,
        progress_store: Arc<dyn ProgressStore>,
        statistics: Arc<StatisticsService>,
        achievements: Arc<AchievementService>,
    ) -> Self {
        let settings = EngineSettings::default_engine();
        let snapshots = SnapshotKeeper::new(clock, Arc::clone(&progress_store), &settings);
        Self {
            clock,
            settings,
            vocabulary,
            records,
            statistics,
            achievements,
            progress_store,
            snapshots,
            active: Mutex::new(None),
            finalize_in_flight: AtomicBool::new(false),
        }
    }

    /// Replace the engine policy constants.
    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.snapshots =
            SnapshotKeeper::new(self.clock, Arc::clone(&self.progress_store), &settings);
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn lock_active(&self) -> Result<MutexGuard<'_, Option<PracticeSession>>, SessionError> {
        self.active
            .lock()
            .map_err(|e| SessionError::Storage(StorageError::Connection(e.to_string())))
    }

    /// A read-only copy of the active session, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the session lock is poisoned.
    pub fn active_session(&self) -> Result<Option<PracticeSession>, SessionError> {
        Ok(self.lock_active()?.clone())
    }

    /// Start a new session: fetch a batch, shuffle and truncate it, and take
    /// ownership of the fresh state machine.
    ///
    /// # Errors
    ///
    /// - `WordCountTooSmall` when the request is under the configured minimum
    /// - `AlreadyActive` while a non-complete session exists (reset first)
    /// - `EmptyPool` when the vocabulary source matches nothing; the caller
    ///   reports this so the user can relax the filters, it is not retried
    pub async fn start_session(
        &self,
        session_type: SessionType,
        config: SessionConfig,
    ) -> Result<PracticeSession, SessionError> {
        if config.word_count < self.settings.min_session_words() {
            return Err(SessionError::WordCountTooSmall {
                provided: config.word_count,
                min: self.settings.min_session_words(),
            });
        }

        {
            let guard = self.lock_active()?;
            if guard.as_ref().is_some_and(|s| !s.is_complete()) {
                return Err(SessionError::AlreadyActive);
            }
        }

        let query = VocabularyQuery {
            session_type,
            word_count: config.word_count,
            difficulty: config.difficulty,
            status: config.status,
            shuffle: config.shuffle_words,
        };
        let mut items = self.vocabulary.fetch_batch(&query).await?;
        if items.is_empty() {
            return Err(SessionError::EmptyPool);
        }

        if config.shuffle_words {
            let mut rng = rng();
            items.as_mut_slice().shuffle(&mut rng);
        }
        items.truncate(usize::try_from(config.word_count).unwrap_or(usize::MAX));

        let session = PracticeSession::new(session_type, items, config, self.clock.now())?;
        self.snapshots.save(&session).await;

        {
            let mut guard = self.lock_active()?;
            if guard.as_ref().is_some_and(|s| !s.is_complete()) {
                return Err(SessionError::AlreadyActive);
            }
            *guard = Some(session.clone());
        }
        Ok(session)
    }

    /// Rehydrate the persisted snapshot into the active slot, if one is
    /// resumable.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyActive` while a non-complete session exists.
    pub async fn resume_session(&self) -> Result<Option<PracticeSession>, SessionError> {
        {
            let guard = self.lock_active()?;
            if guard.as_ref().is_some_and(|s| !s.is_complete()) {
                return Err(SessionError::AlreadyActive);
            }
        }

        let Some(snapshot) = self.snapshots.load().await else {
            return Ok(None);
        };

        let session = snapshot.session;
        let mut guard = self.lock_active()?;
        *guard = Some(session.clone());
        Ok(Some(session))
    }

    /// Whether a resumable snapshot exists, without touching in-memory state.
    pub async fn has_resumable(&self) -> bool {
        self.snapshots.has_resumable().await
    }

    /// Submit an answer for the current word and autosave the new state.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveSession` when nothing is in the active slot. A paused
    /// or completed session rejects the answer via `accepted == false`
    /// without mutating anything.
    pub async fn submit_answer(&self, answer: Answer) -> Result<SessionAnswerResult, SessionError> {
        let now = self.clock.now();
        let (snapshot, result) = {
            let mut guard = self.lock_active()?;
            let Some(session) = guard.as_mut() else {
                return Err(SessionError::NoActiveSession);
            };

            let accepted = !session.is_paused() && !session.is_complete();
            let completed_session = session.submit_answer(answer, &self.settings, now);
            let result = SessionAnswerResult {
                accepted,
                completed_session,
                progress: session.progress(),
            };
            (accepted.then(|| session.clone()), result)
        };

        // Save after every accepted answer; loss is bounded by the cadence.
        if let Some(session) = snapshot {
            self.snapshots.save(&session).await;
        }
        Ok(result)
    }

    /// Pause the active session.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveSession` when nothing is in the active slot.
    pub fn pause(&self) -> Result<bool, SessionError> {
        let now = self.clock.now();
        let mut guard = self.lock_active()?;
        let session = guard.as_mut().ok_or(SessionError::NoActiveSession)?;
        Ok(session.pause(now))
    }

    /// Resume the active session from a pause.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveSession` when nothing is in the active slot.
    pub fn resume(&self) -> Result<bool, SessionError> {
        let now = self.clock.now();
        let mut guard = self.lock_active()?;
        let session = guard.as_mut().ok_or(SessionError::NoActiveSession)?;
        Ok(session.resume(now))
    }

    /// Timer re-entry point: autosave on cadence and report time-limit expiry.
    ///
    /// A tick that fires after the session completed or was reset is a no-op;
    /// that check is the cancellation contract for stray timer callbacks. The
    /// machine never force-completes on expiry, the caller decides whether to
    /// abandon.
    pub async fn tick(&self) -> TickOutcome {
        let now = self.clock.now();
        let (snapshot, time_limit_exceeded) = {
            let Ok(guard) = self.active.lock() else {
                return TickOutcome::default();
            };
            let Some(session) = guard.as_ref() else {
                return TickOutcome::default();
            };
            if session.is_complete() {
                return TickOutcome::default();
            }

            let due = self.snapshots.autosave_due(now);
            (
                due.then(|| session.clone()),
                session.time_limit_exceeded(now),
            )
        };

        let saved = if let Some(session) = snapshot {
            debug!(session_id = %session.id(), "autosave cadence reached");
            self.snapshots.save(&session).await;
            true
        } else {
            false
        };

        TickOutcome {
            saved,
            time_limit_exceeded,
        }
    }

    /// Turn the completed session into its durable record: append it, push
    /// per-word mastery updates and review times, clear the resume snapshot,
    /// refresh statistics, and evaluate achievements.
    ///
    /// Returns `Ok(None)` when no word was ever attempted (nothing durable is
    /// written). A failed durable write surfaces and leaves the session
    /// complete, so finalize can simply be re-invoked.
    ///
    /// # Errors
    ///
    /// - `NoActiveSession` / `NotComplete` for precondition violations
    /// - `FinalizeInFlight` while another finalize is running
    /// - `Storage` when the record append or a mastery update fails
    pub async fn finalize(&self) -> Result<Option<FinalizeOutcome>, SessionError> {
        if self.finalize_in_flight.swap(true, Ordering::SeqCst) {
            return Err(SessionError::FinalizeInFlight);
        }
        let result = self.finalize_inner().await;
        self.finalize_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn finalize_inner(&self) -> Result<Option<FinalizeOutcome>, SessionError> {
        let now = self.clock.now();
        let prepared = {
            let guard = self.lock_active()?;
            let Some(session) = guard.as_ref() else {
                return Err(SessionError::NoActiveSession);
            };
            if !session.is_complete() {
                return Err(SessionError::NotComplete);
            }
            if let Some(id) = session.record_id() {
                Prepared::AlreadyRecorded(id)
            } else if session.attempted_count() == 0 {
                Prepared::NothingAttempted
            } else {
                Prepared::Ready {
                    record: session.build_record()?,
                    updates: session.mastery_updates(),
                    schedule: session.review_schedule(),
                }
            }
        };

        match prepared {
            Prepared::NothingAttempted => {
                self.snapshots.clear().await;
                Ok(None)
            }
            Prepared::AlreadyRecorded(record_id) => {
                let record = {
                    let guard = self.lock_active()?;
                    let session = guard.as_ref().ok_or(SessionError::NoActiveSession)?;
                    session.build_record()?
                };
                let stats = self.statistics.current_stats().await?;
                Ok(Some(FinalizeOutcome {
                    record_id,
                    record,
                    stats,
                    newly_unlocked: Vec::new(),
                }))
            }
            Prepared::Ready {
                record,
                updates,
                schedule,
            } => {
                let record_id = self.records.append_record(&record).await?;

                for update in &updates {
                    self.vocabulary.apply_mastery(update, &self.settings).await?;
                }
                for (word_id, at) in &schedule {
                    self.vocabulary.set_next_review(*word_id, *at).await?;
                }

                self.snapshots.clear().await;
                self.statistics.invalidate();
                let stats = self.statistics.refresh().await?;
                let newly_unlocked = self.achievements.evaluate(&record, &stats, now).await?;

                {
                    let mut guard = self.lock_active()?;
                    if let Some(session) = guard.as_mut() {
                        session.set_record_id(record_id);
                    }
                }

                Ok(Some(FinalizeOutcome {
                    record_id,
                    record,
                    stats,
                    newly_unlocked,
                }))
            }
        }
    }

    /// Discard the in-memory session and its resume snapshot. Durable history
    /// is untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the session lock is poisoned.
    pub async fn reset(&self) -> Result<(), SessionError> {
        {
            let mut guard = self.lock_active()?;
            *guard = None;
        }
        self.snapshots.clear().await;
        Ok(())
    }
}
