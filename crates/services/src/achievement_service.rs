use std::sync::Arc;

use chrono::{DateTime, Utc};

use storage::repository::AchievementStore;
use vocab_core::achievements::{AchievementRule, default_rules};
use vocab_core::model::FinalizedSessionRecord;
use vocab_core::stats::PracticeStatistics;

use crate::error::SessionError;

/// An achievement that fired during this finalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockedAchievement {
    pub id: String,
    pub title: String,
}

/// Evaluates the rule catalog once per finalized session.
///
/// Each rule is checked against the durable unlocked set before its predicate
/// runs, and the unlock write itself is idempotent, so a rule fires at most
/// once per user ever even when a finalize is retried.
pub struct AchievementService {
    rules: Vec<AchievementRule>,
    store: Arc<dyn AchievementStore>,
}

impl AchievementService {
    #[must_use]
    pub fn new(store: Arc<dyn AchievementStore>) -> Self {
        Self {
            rules: default_rules(),
            store,
        }
    }

    /// Replace the rule catalog.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<AchievementRule>) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[AchievementRule] {
        &self.rules
    }

    /// Check every rule against the just-finalized session and fresh stats,
    /// unlocking and returning the ones that fired for the first time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the unlock set cannot be read or
    /// written.
    pub async fn evaluate(
        &self,
        session: &FinalizedSessionRecord,
        stats: &PracticeStatistics,
        now: DateTime<Utc>,
    ) -> Result<Vec<UnlockedAchievement>, SessionError> {
        let mut unlocked = Vec::new();
        for rule in &self.rules {
            let id = rule.id();
            if self.store.is_unlocked(&id).await? {
                continue;
            }
            if rule.is_satisfied(session, stats) {
                self.store.unlock(&id, now).await?;
                unlocked.push(UnlockedAchievement {
                    id,
                    title: rule.title(),
                });
            }
        }
        Ok(unlocked)
    }

    /// All rule ids ever unlocked.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the unlock set cannot be read.
    pub async fn unlocked(&self) -> Result<Vec<String>, SessionError> {
        Ok(self.store.unlocked_ids().await?)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use vocab_core::model::{SessionType, WordId, WordResult};
    use vocab_core::stats::SessionsByType;
    use vocab_core::time::fixed_now;

    fn build_record(score: u8) -> FinalizedSessionRecord {
        FinalizedSessionRecord::from_parts(
            SessionType::Flashcard,
            score,
            120,
            None,
            vec![WordResult {
                vocabulary_id: WordId::new(1),
                is_correct: true,
                time_spent_seconds: 120,
                attempts: 1,
            }],
            fixed_now(),
        )
        .unwrap()
    }

    fn stats_with_sessions(total_sessions: u32) -> PracticeStatistics {
        PracticeStatistics {
            total_sessions,
            total_time_spent_seconds: 600,
            average_score: 70.0,
            best_score: 100,
            current_streak: 1,
            longest_streak: 1,
            sessions_by_type: SessionsByType {
                flashcard: total_sessions,
                ..SessionsByType::default()
            },
        }
    }

    #[tokio::test]
    async fn satisfied_rules_unlock_once() {
        let repo = InMemoryRepository::new();
        let service = AchievementService::new(Arc::new(repo.clone()));

        let record = build_record(100);
        let stats = stats_with_sessions(1);

        let first = service.evaluate(&record, &stats, fixed_now()).await.unwrap();
        let ids: Vec<&str> = first.iter().map(|u| u.id.as_str()).collect();
        assert!(ids.contains(&"first_session"));
        assert!(ids.contains(&"perfect_score"));

        // A duplicate finalize replays the evaluation; nothing re-fires.
        let second = service.evaluate(&record, &stats, fixed_now()).await.unwrap();
        assert!(second.is_empty());

        assert!(service
            .unlocked()
            .await
            .unwrap()
            .contains(&"first_session".to_string()));
    }

    #[tokio::test]
    async fn unsatisfied_rules_stay_locked() {
        let repo = InMemoryRepository::new();
        let service = AchievementService::new(Arc::new(repo.clone()));

        let record = build_record(60);
        let stats = stats_with_sessions(1);

        let unlocked = service.evaluate(&record, &stats, fixed_now()).await.unwrap();
        let ids: Vec<&str> = unlocked.iter().map(|u| u.id.as_str()).collect();
        assert!(!ids.contains(&"perfect_score"));
        assert!(!ids.contains(&"sessions_10"));
    }

    #[tokio::test]
    async fn custom_catalog_replaces_defaults() {
        let repo = InMemoryRepository::new();
        let service = AchievementService::new(Arc::new(repo))
            .with_rules(vec![AchievementRule::SessionsCompleted(2)]);

        assert_eq!(service.rules().len(), 1);

        let record = build_record(80);
        let unlocked = service
            .evaluate(&record, &stats_with_sessions(1), fixed_now())
            .await
            .unwrap();
        assert!(unlocked.is_empty());

        let unlocked = service
            .evaluate(&record, &stats_with_sessions(2), fixed_now())
            .await
            .unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].id, "sessions_2");
    }
}
