use crate::model::FinalizedSessionRecord;
use crate::stats::PracticeStatistics;

//
// ─── RULES ─────────────────────────────────────────────────────────────────────
//

/// A single achievement rule with a pure predicate.
///
/// Rules are data, not closures, so the catalog can be listed, persisted by
/// id, and evaluated by a generic engine. Idempotent unlocking (each rule
/// fires at most once per user) is handled by the evaluation layer against a
/// durable unlocked set, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementRule {
    /// The very first finalized session.
    FirstSession,
    /// A session scored at 100.
    PerfectScore,
    /// Total finalized sessions reached this count.
    SessionsCompleted(u32),
    /// Current daily streak reached this length.
    StreakDays(u32),
    /// Cumulative practice time crossed this many seconds.
    MarathonTime { total_seconds: u64 },
    /// At least one session finalized in every session type.
    TypeExplorer,
}

impl AchievementRule {
    /// Stable identifier used as the durable unlock key.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            AchievementRule::FirstSession => "first_session".to_string(),
            AchievementRule::PerfectScore => "perfect_score".to_string(),
            AchievementRule::SessionsCompleted(n) => format!("sessions_{n}"),
            AchievementRule::StreakDays(n) => format!("streak_{n}"),
            AchievementRule::MarathonTime { total_seconds } => {
                format!("marathon_{total_seconds}s")
            }
            AchievementRule::TypeExplorer => "type_explorer".to_string(),
        }
    }

    /// Human-facing title for the unlocked badge.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            AchievementRule::FirstSession => "First Steps".to_string(),
            AchievementRule::PerfectScore => "Flawless".to_string(),
            AchievementRule::SessionsCompleted(n) => format!("{n} Sessions Strong"),
            AchievementRule::StreakDays(n) => format!("{n}-Day Streak"),
            AchievementRule::MarathonTime { total_seconds } => {
                format!("Marathon: {} minutes", total_seconds / 60)
            }
            AchievementRule::TypeExplorer => "Explorer".to_string(),
        }
    }

    /// Whether the just-finalized session plus fresh aggregate satisfy this rule.
    #[must_use]
    pub fn is_satisfied(
        &self,
        session: &FinalizedSessionRecord,
        stats: &PracticeStatistics,
    ) -> bool {
        match self {
            AchievementRule::FirstSession => stats.total_sessions >= 1,
            AchievementRule::PerfectScore => session.score() == 100,
            AchievementRule::SessionsCompleted(n) => stats.total_sessions >= *n,
            AchievementRule::StreakDays(n) => stats.current_streak >= *n,
            AchievementRule::MarathonTime { total_seconds } => {
                stats.total_time_spent_seconds >= *total_seconds
            }
            AchievementRule::TypeExplorer => {
                let by_type = &stats.sessions_by_type;
                by_type.flashcard > 0
                    && by_type.multiple_choice > 0
                    && by_type.fill_blanks > 0
                    && by_type.listening > 0
                    && by_type.mixed > 0
            }
        }
    }
}

/// The built-in rule catalog.
#[must_use]
pub fn default_rules() -> Vec<AchievementRule> {
    vec![
        AchievementRule::FirstSession,
        AchievementRule::PerfectScore,
        AchievementRule::SessionsCompleted(10),
        AchievementRule::SessionsCompleted(50),
        AchievementRule::StreakDays(3),
        AchievementRule::StreakDays(7),
        AchievementRule::StreakDays(30),
        AchievementRule::MarathonTime {
            total_seconds: 3_600,
        },
        AchievementRule::TypeExplorer,
    ]
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
