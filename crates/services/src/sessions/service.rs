use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use storage::repository::MasteryUpdate;
use vocab_core::interval;
use vocab_core::model::{
    DifficultyTag, EngineSettings, FinalizedSessionRecord, MasteryStatus, Rating, SessionId,
    SessionType, VocabularyItem, WordId, WordResult,
};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── SESSION CONFIG ────────────────────────────────────────────────────────────
//

/// Caller-supplied options for one practice session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub word_count: u32,
    pub difficulty: Option<DifficultyTag>,
    pub status: Option<MasteryStatus>,
    pub include_definitions: bool,
    pub include_examples: bool,
    pub shuffle_words: bool,
    pub time_limit_seconds: Option<u32>,
}

impl SessionConfig {
    /// A plain session over `word_count` words with no filters or time limit.
    #[must_use]
    pub fn quick(word_count: u32) -> Self {
        Self {
            word_count,
            difficulty: None,
            status: None,
            include_definitions: true,
            include_examples: false,
            shuffle_words: true,
            time_limit_seconds: None,
        }
    }
}

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// One submitted answer for the currently presented word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub user_answer: String,
    pub is_correct: bool,
    pub time_spent_seconds: u32,
    pub rating: Option<Rating>,
}

//
// ─── PRACTICE WORD ─────────────────────────────────────────────────────────────
//

/// One session item and everything recorded about its presentation.
///
/// Created with zero attempts when the session is initialized and mutated
/// exactly once, by the answer submission for its position. Part of the
/// session's permanent record, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeWord {
    item: VocabularyItem,
    attempts: u32,
    is_correct: Option<bool>,
    time_spent_seconds: u32,
    user_answer: Option<String>,
    rating: Option<Rating>,
    next_review_at: Option<DateTime<Utc>>,
}

impl PracticeWord {
    fn fresh(item: VocabularyItem) -> Self {
        Self {
            item,
            attempts: 0,
            is_correct: None,
            time_spent_seconds: 0,
            user_answer: None,
            rating: None,
            next_review_at: None,
        }
    }

    #[must_use]
    pub fn item(&self) -> &VocabularyItem {
        &self.item
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }

    #[must_use]
    pub fn time_spent_seconds(&self) -> u32 {
        self.time_spent_seconds
    }

    #[must_use]
    pub fn user_answer(&self) -> Option<&str> {
        self.user_answer.as_deref()
    }

    #[must_use]
    pub fn rating(&self) -> Option<Rating> {
        self.rating
    }

    #[must_use]
    pub fn next_review_at(&self) -> Option<DateTime<Utc>> {
        self.next_review_at
    }
}

//
// ─── PRACTICE SESSION ──────────────────────────────────────────────────────────
//

/// In-memory state machine for one timed quiz run.
///
/// Lifecycle: `Uninitialized -> Active <-> Paused -> Complete`. Completion is
/// defined as the cursor reaching the end of the word list; nothing leaves
/// `Complete` except dropping the session. Every mutating operation either
/// fully applies or fully no-ops, which keeps the counters consistent at all
/// times:
///
/// - `0 <= current <= words.len()`
/// - `is_complete() <=> current == words.len()`
/// - `correct_answers == words[..current] with is_correct == Some(true)`
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeSession {
    id: SessionId,
    session_type: SessionType,
    words: Vec<PracticeWord>,
    current: usize,
    correct_answers: u32,
    time_spent_seconds: u32,
    started_at: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    total_paused_seconds: i64,
    completed_at: Option<DateTime<Utc>>,
    config: SessionConfig,
    #[serde(skip)]
    record_id: Option<i64>,
}

impl PracticeSession {
    /// Create a session over the given vocabulary items.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyPool` if no items are provided.
    pub fn new(
        session_type: SessionType,
        items: Vec<VocabularyItem>,
        config: SessionConfig,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if items.is_empty() {
            return Err(SessionError::EmptyPool);
        }

        Ok(Self {
            id: SessionId::generate(),
            session_type,
            words: items.into_iter().map(PracticeWord::fresh).collect(),
            current: 0,
            correct_answers: 0,
            time_spent_seconds: 0,
            started_at,
            paused_at: None,
            total_paused_seconds: 0,
            completed_at: None,
            config,
            record_id: None,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn words(&self) -> &[PracticeWord] {
        &self.words
    }

    #[must_use]
    pub fn total_words(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn time_spent_seconds(&self) -> u32 {
        self.time_spent_seconds
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current >= self.words.len()
    }

    #[must_use]
    pub fn record_id(&self) -> Option<i64> {
        self.record_id
    }

    pub(crate) fn set_record_id(&mut self, id: i64) {
        self.record_id = Some(id);
    }

    /// The word currently presented, `None` once the session is complete.
    #[must_use]
    pub fn current_word(&self) -> Option<&PracticeWord> {
        self.words.get(self.current)
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total_words(),
            answered: self.current,
            correct: self.correct_answers,
            remaining: self.words.len().saturating_sub(self.current),
            is_complete: self.is_complete(),
        }
    }

    /// Record an answer for the current word and advance the cursor.
    ///
    /// The cursor advances by exactly one regardless of correctness: a missed
    /// word is never re-presented within the same session, remediation
    /// happens in a future session through its next-review time. When a
    /// rating is supplied, the word's `next_review_at` is set from the
    /// interval policy.
    ///
    /// No-op returning `false` while the session is paused or complete.
    /// Returns `true` iff this call completed the session; that return value
    /// is the caller's only signal to finalize.
    pub fn submit_answer(
        &mut self,
        answer: Answer,
        settings: &EngineSettings,
        now: DateTime<Utc>,
    ) -> bool {
        if self.is_paused() || self.is_complete() {
            return false;
        }

        let word = &mut self.words[self.current];
        word.attempts += 1;
        word.is_correct = Some(answer.is_correct);
        word.time_spent_seconds = word.time_spent_seconds.saturating_add(answer.time_spent_seconds);
        word.user_answer = Some(answer.user_answer);
        word.rating = answer.rating;
        word.next_review_at = answer
            .rating
            .map(|rating| interval::next_review_at(rating, settings, now));

        if answer.is_correct {
            self.correct_answers += 1;
        }
        self.time_spent_seconds = self
            .time_spent_seconds
            .saturating_add(answer.time_spent_seconds);

        self.current += 1;
        if self.current == self.words.len() {
            self.completed_at = Some(now);
            return true;
        }
        false
    }

    /// Pause the session. No-op when already paused or complete.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_paused() || self.is_complete() {
            return false;
        }
        self.paused_at = Some(now);
        true
    }

    /// Resume a paused session, folding the pause span into the tally so
    /// elapsed-time accounting excludes it. No-op when not paused.
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        let Some(paused_at) = self.paused_at.take() else {
            return false;
        };
        self.total_paused_seconds += (now - paused_at).num_seconds().max(0);
        true
    }

    /// Wall-clock time since start minus every paused span, including a
    /// currently open one.
    #[must_use]
    pub fn active_elapsed(&self, now: DateTime<Utc>) -> Duration {
        let mut paused = self.total_paused_seconds;
        if let Some(paused_at) = self.paused_at {
            paused += (now - paused_at).num_seconds().max(0);
        }
        let elapsed = (now - self.started_at).num_seconds().max(0) - paused;
        Duration::seconds(elapsed.max(0))
    }

    /// Whether the configured time limit has run out of active time.
    #[must_use]
    pub fn time_limit_exceeded(&self, now: DateTime<Utc>) -> bool {
        self.config
            .time_limit_seconds
            .is_some_and(|limit| self.active_elapsed(now) >= Duration::seconds(i64::from(limit)))
    }

    /// Number of words with at least one recorded attempt.
    #[must_use]
    pub fn attempted_count(&self) -> usize {
        self.words.iter().filter(|w| w.attempts > 0).count()
    }

    /// Overall score in whole percent, rounded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn score(&self) -> u8 {
        if self.words.is_empty() {
            return 0;
        }
        (f64::from(self.correct_answers) * 100.0 / self.words.len() as f64).round() as u8
    }

    /// Build the durable record for this completed session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` while words remain, and propagates
    /// record validation failures.
    pub fn build_record(&self) -> Result<FinalizedSessionRecord, SessionError> {
        let Some(completed_at) = self.completed_at else {
            return Err(SessionError::NotComplete);
        };

        let word_results: Vec<WordResult> = self
            .words
            .iter()
            .filter(|w| w.attempts > 0)
            .map(|w| WordResult {
                vocabulary_id: w.item.id(),
                is_correct: w.is_correct.unwrap_or(false),
                time_spent_seconds: w.time_spent_seconds,
                attempts: w.attempts,
            })
            .collect();

        Ok(FinalizedSessionRecord::from_parts(
            self.session_type,
            self.score(),
            self.time_spent_seconds,
            self.config.difficulty,
            word_results,
            completed_at,
        )?)
    }

    /// Mastery updates to push for every attempted word.
    #[must_use]
    pub fn mastery_updates(&self) -> Vec<MasteryUpdate> {
        self.words
            .iter()
            .filter(|w| w.attempts > 0)
            .map(|w| MasteryUpdate {
                vocabulary_id: w.item.id(),
                is_correct: w.is_correct.unwrap_or(false),
                attempts: w.attempts,
                time_spent_seconds: w.time_spent_seconds,
            })
            .collect()
    }

    /// Next-review times chosen by the user's ratings during this session.
    #[must_use]
    pub fn review_schedule(&self) -> Vec<(WordId, DateTime<Utc>)> {
        self.words
            .iter()
            .filter_map(|w| w.next_review_at.map(|at| (w.item.id(), at)))
            .collect()
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("id", &self.id)
            .field("session_type", &self.session_type)
            .field("words_len", &self.words.len())
            .field("current", &self.current)
            .field("correct_answers", &self.correct_answers)
            .field("started_at", &self.started_at)
            .field("paused_at", &self.paused_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::time::fixed_now;

    fn build_item(id: u64) -> VocabularyItem {
        VocabularyItem::new(
            WordId::new(id),
            format!("word-{id}"),
            format!("translation-{id}"),
            None,
            None,
            None,
            DifficultyTag::Easy,
            MasteryStatus::New,
        )
        .unwrap()
    }

    fn build_session(count: u64) -> PracticeSession {
        let items = (1..=count).map(build_item).collect();
        PracticeSession::new(
            SessionType::Flashcard,
            items,
            SessionConfig::quick(count.try_into().unwrap()),
            fixed_now(),
        )
        .unwrap()
    }

    fn answer(is_correct: bool) -> Answer {
        Answer {
            user_answer: "antwort".to_string(),
            is_correct,
            time_spent_seconds: 10,
            rating: None,
        }
    }

    fn correct_prefix_count(session: &PracticeSession) -> u32 {
        session.words()[..session.current_index()]
            .iter()
            .filter(|w| w.is_correct() == Some(true))
            .count()
            .try_into()
            .unwrap()
    }

    #[test]
    fn empty_pool_is_rejected() {
        let err = PracticeSession::new(
            SessionType::Flashcard,
            Vec::new(),
            SessionConfig::quick(5),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::EmptyPool));
    }

    #[test]
    fn correct_counter_matches_prefix_at_every_step() {
        let settings = EngineSettings::default_engine();
        let mut session = build_session(4);

        for is_correct in [true, false, true, false] {
            session.submit_answer(answer(is_correct), &settings, fixed_now());
            assert_eq!(session.correct_answers(), correct_prefix_count(&session));
        }
        assert!(session.is_complete());
    }

    #[test]
    fn three_word_scenario_scores_33() {
        let settings = EngineSettings::default_engine();
        let mut session = build_session(3);

        assert!(!session.submit_answer(answer(true), &settings, fixed_now()));
        assert!(!session.submit_answer(answer(false), &settings, fixed_now()));
        assert!(session.submit_answer(answer(false), &settings, fixed_now()));

        assert!(session.is_complete());
        assert_eq!(session.correct_answers(), 1);
        assert_eq!(session.score(), 33);
        assert_eq!(session.time_spent_seconds(), 30);
    }

    #[test]
    fn cursor_advances_on_incorrect_answers_too() {
        let settings = EngineSettings::default_engine();
        let mut session = build_session(3);

        let first = session.current_word().unwrap().item().id();
        session.submit_answer(answer(false), &settings, fixed_now());
        let second = session.current_word().unwrap().item().id();

        assert_ne!(first, second);
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.words()[0].attempts(), 1);
    }

    #[test]
    fn submit_while_paused_is_a_silent_no_op() {
        let settings = EngineSettings::default_engine();
        let mut session = build_session(2);
        let before = session.clone();

        assert!(session.pause(fixed_now()));
        assert!(!session.submit_answer(answer(true), &settings, fixed_now()));

        assert_eq!(session.current_index(), before.current_index());
        assert_eq!(session.correct_answers(), before.correct_answers());
        assert_eq!(session.words(), before.words());
    }

    #[test]
    fn submit_after_completion_is_a_silent_no_op() {
        let settings = EngineSettings::default_engine();
        let mut session = build_session(1);

        assert!(session.submit_answer(answer(true), &settings, fixed_now()));
        let before = session.clone();

        assert!(!session.submit_answer(answer(true), &settings, fixed_now()));
        assert_eq!(session, before);
    }

    #[test]
    fn ratings_schedule_next_review_by_policy() {
        let settings = EngineSettings::default_engine();
        let mut session = build_session(2);
        let now = fixed_now();

        session.submit_answer(
            Answer {
                rating: Some(Rating::Again),
                ..answer(false)
            },
            &settings,
            now,
        );
        session.submit_answer(
            Answer {
                rating: Some(Rating::Easy),
                ..answer(true)
            },
            &settings,
            now,
        );

        assert_eq!(
            session.words()[0].next_review_at(),
            Some(now + Duration::days(1))
        );
        assert_eq!(
            session.words()[1].next_review_at(),
            Some(now + Duration::days(7))
        );

        let schedule = session.review_schedule();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0], (WordId::new(1), now + Duration::days(1)));
    }

    #[test]
    fn pause_intervals_are_excluded_from_elapsed_time() {
        let mut session = build_session(2);
        let start = fixed_now();

        let paused_at = start + Duration::seconds(20);
        assert!(session.pause(paused_at));
        // pausing twice changes nothing
        assert!(!session.pause(paused_at + Duration::seconds(1)));

        let resumed_at = paused_at + Duration::seconds(100);
        assert!(session.resume(resumed_at));
        assert!(!session.resume(resumed_at));

        let now = resumed_at + Duration::seconds(30);
        assert_eq!(session.active_elapsed(now), Duration::seconds(50));
    }

    #[test]
    fn open_pause_span_counts_against_elapsed() {
        let mut session = build_session(2);
        let start = fixed_now();

        session.pause(start + Duration::seconds(10));
        let now = start + Duration::seconds(500);
        assert_eq!(session.active_elapsed(now), Duration::seconds(10));
    }

    #[test]
    fn time_limit_uses_active_time_only() {
        let mut session = build_session(2);
        session.config.time_limit_seconds = Some(60);
        let start = fixed_now();

        session.pause(start + Duration::seconds(30));
        session.resume(start + Duration::seconds(300));

        // 30s active before the pause + 20s after resume = 50s active
        assert!(!session.time_limit_exceeded(start + Duration::seconds(320)));
        assert!(session.time_limit_exceeded(start + Duration::seconds(331)));
    }

    #[test]
    fn progress_view_tracks_the_cursor() {
        let settings = EngineSettings::default_engine();
        let mut session = build_session(3);

        assert_eq!(
            session.progress(),
            SessionProgress {
                total: 3,
                answered: 0,
                correct: 0,
                remaining: 3,
                is_complete: false,
            }
        );

        session.submit_answer(answer(true), &settings, fixed_now());
        let progress = session.progress();
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.correct, 1);
        assert_eq!(progress.remaining, 2);
        assert!(!progress.is_complete);
    }

    #[test]
    fn build_record_requires_completion() {
        let session = build_session(2);
        assert!(matches!(
            session.build_record(),
            Err(SessionError::NotComplete)
        ));
    }

    #[test]
    fn build_record_collects_attempted_words() {
        let settings = EngineSettings::default_engine();
        let mut session = build_session(2);

        session.submit_answer(answer(true), &settings, fixed_now());
        session.submit_answer(answer(false), &settings, fixed_now());

        let record = session.build_record().unwrap();
        assert_eq!(record.score(), 50);
        assert_eq!(record.word_results().len(), 2);
        assert_eq!(record.created_at(), fixed_now());
        assert_eq!(record.correct_count(), 1);

        let updates = session.mastery_updates();
        assert_eq!(updates.len(), 2);
        assert!(updates[0].is_correct);
        assert!(!updates[1].is_correct);
    }

    #[test]
    fn snapshot_roundtrip_preserves_state() {
        let settings = EngineSettings::default_engine();
        let mut session = build_session(3);
        session.submit_answer(answer(true), &settings, fixed_now());

        let blob = serde_json::to_string(&session).unwrap();
        let restored: PracticeSession = serde_json::from_str(&blob).unwrap();

        assert_eq!(restored, session);
        assert_eq!(restored.current_index(), 1);
        assert_eq!(restored.correct_answers(), 1);
    }
}
