use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, TimeZone};

use crate::model::{FinalizedSessionRecord, SessionType};

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Per-type session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionsByType {
    pub flashcard: u32,
    pub multiple_choice: u32,
    pub fill_blanks: u32,
    pub listening: u32,
    pub mixed: u32,
}

impl SessionsByType {
    #[must_use]
    pub fn count(&self, kind: SessionType) -> u32 {
        match kind {
            SessionType::Flashcard => self.flashcard,
            SessionType::MultipleChoice => self.multiple_choice,
            SessionType::FillBlanks => self.fill_blanks,
            SessionType::Listening => self.listening,
            SessionType::Mixed => self.mixed,
        }
    }

    fn bump(&mut self, kind: SessionType) {
        match kind {
            SessionType::Flashcard => self.flashcard += 1,
            SessionType::MultipleChoice => self.multiple_choice += 1,
            SessionType::FillBlanks => self.fill_blanks += 1,
            SessionType::Listening => self.listening += 1,
            SessionType::Mixed => self.mixed += 1,
        }
    }
}

/// Aggregate view over the full history of finalized sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeStatistics {
    pub total_sessions: u32,
    pub total_time_spent_seconds: u64,
    pub average_score: f64,
    pub best_score: u8,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub sessions_by_type: SessionsByType,
}

impl PracticeStatistics {
    /// The all-zero aggregate for an empty history.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_sessions: 0,
            total_time_spent_seconds: 0,
            average_score: 0.0,
            best_score: 0,
            current_streak: 0,
            longest_streak: 0,
            sessions_by_type: SessionsByType::default(),
        }
    }
}

//
// ─── AGGREGATION ───────────────────────────────────────────────────────────────
//

/// Computes streaks, averages, and per-type counts over a session history.
///
/// Streaks run on calendar days in the caller's timezone: a session's day is
/// `created_at` converted to `tz`. `today` must be derived with the same zone
/// (see `Clock::today_in`), otherwise the current streak can be off by one.
///
/// - `current_streak`: consecutive days with at least one session, ending at
///   `today` or yesterday, walking backward; any gap breaks it.
/// - `longest_streak`: longest run of consecutive distinct session dates
///   anywhere in history.
/// - `average_score` / `best_score` are 0 for an empty history.
#[must_use]
pub fn compute_stats<Tz: TimeZone>(
    records: &[FinalizedSessionRecord],
    tz: &Tz,
    today: NaiveDate,
) -> PracticeStatistics {
    if records.is_empty() {
        return PracticeStatistics::empty();
    }

    let mut total_time: u64 = 0;
    let mut score_sum: u64 = 0;
    let mut best_score: u8 = 0;
    let mut by_type = SessionsByType::default();
    let mut days: BTreeSet<NaiveDate> = BTreeSet::new();

    for record in records {
        total_time += u64::from(record.time_spent_seconds());
        score_sum += u64::from(record.score());
        best_score = best_score.max(record.score());
        by_type.bump(record.session_type());
        days.insert(record.created_at().with_timezone(tz).date_naive());
    }

    #[allow(clippy::cast_precision_loss)]
    let average_score = score_sum as f64 / records.len() as f64;

    PracticeStatistics {
        total_sessions: u32::try_from(records.len()).unwrap_or(u32::MAX),
        total_time_spent_seconds: total_time,
        average_score,
        best_score,
        current_streak: current_streak(&days, today),
        longest_streak: longest_streak(&days),
        sessions_by_type: by_type,
    }
}

/// Consecutive practiced days ending at `today` or yesterday.
fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let yesterday = today - Duration::days(1);
    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive distinct session dates anywhere in history.
fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for day in days {
        run = match previous {
            Some(prev) if *day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }
    longest
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    use crate::model::{SessionType, WordId, WordResult};
    use crate::time::fixed_now;

    fn record_on(day_offset: i64, score: u8, kind: SessionType) -> FinalizedSessionRecord {
        let created_at: DateTime<Utc> = fixed_now() - Duration::days(day_offset);
        FinalizedSessionRecord::from_parts(
            kind,
            score,
            60,
            None,
            vec![WordResult {
                vocabulary_id: WordId::new(1),
                is_correct: score > 0,
                time_spent_seconds: 60,
                attempts: 1,
            }],
            created_at,
        )
        .unwrap()
    }

    fn today() -> NaiveDate {
        fixed_now().date_naive()
    }

    #[test]
    fn empty_history_is_all_zero() {
        let stats = compute_stats(&[], &Utc, today());
        assert_eq!(stats, PracticeStatistics::empty());
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.best_score, 0);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 0);
    }

    #[test]
    fn averages_and_best_score() {
        let records = vec![
            record_on(0, 100, SessionType::Flashcard),
            record_on(1, 50, SessionType::Flashcard),
            record_on(2, 0, SessionType::Mixed),
        ];
        let stats = compute_stats(&records, &Utc, today());

        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_time_spent_seconds, 180);
        assert!((stats.average_score - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.best_score, 100);
        assert_eq!(stats.sessions_by_type.count(SessionType::Flashcard), 2);
        assert_eq!(stats.sessions_by_type.count(SessionType::Mixed), 1);
        assert_eq!(stats.sessions_by_type.count(SessionType::Listening), 0);
    }

    #[test]
    fn streak_over_three_days_with_isolated_older_day() {
        // Sessions on D, D-1, D-2 but not D-3; an isolated session on D-10.
        let records = vec![
            record_on(0, 80, SessionType::Flashcard),
            record_on(1, 70, SessionType::Flashcard),
            record_on(2, 60, SessionType::Flashcard),
            record_on(10, 90, SessionType::Mixed),
        ];
        let stats = compute_stats(&records, &Utc, today());

        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.longest_streak, 3);
    }

    #[test]
    fn streak_ending_yesterday_still_counts() {
        let records = vec![
            record_on(1, 80, SessionType::Flashcard),
            record_on(2, 80, SessionType::Flashcard),
        ];
        let stats = compute_stats(&records, &Utc, today());
        assert_eq!(stats.current_streak, 2);
    }

    #[test]
    fn gap_before_today_resets_current_streak() {
        let records = vec![
            record_on(2, 80, SessionType::Flashcard),
            record_on(3, 80, SessionType::Flashcard),
        ];
        let stats = compute_stats(&records, &Utc, today());
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 2);
    }

    #[test]
    fn longest_streak_can_live_in_the_past() {
        let records = vec![
            record_on(0, 80, SessionType::Flashcard),
            record_on(5, 80, SessionType::Flashcard),
            record_on(6, 80, SessionType::Flashcard),
            record_on(7, 80, SessionType::Flashcard),
            record_on(8, 80, SessionType::Flashcard),
        ];
        let stats = compute_stats(&records, &Utc, today());
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 4);
    }

    #[test]
    fn multiple_sessions_on_one_day_count_once_for_streaks() {
        let records = vec![
            record_on(0, 80, SessionType::Flashcard),
            record_on(0, 90, SessionType::Mixed),
            record_on(1, 70, SessionType::Flashcard),
        ];
        let stats = compute_stats(&records, &Utc, today());
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 2);
    }
}
