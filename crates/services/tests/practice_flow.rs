use std::sync::Arc;

use services::{
    AchievementService, Answer, Clock, InMemoryStatsCache, PracticeLoopService, SessionConfig,
    SessionError, StatisticsService,
};
use storage::repository::{InMemoryRepository, ProgressStore, VocabularyRepository};
use vocab_core::model::{
    DifficultyTag, MasteryStatus, Rating, SessionType, VocabularyItem, WordId,
};
use vocab_core::time::{fixed_clock, fixed_now};

async fn seed_words(repo: &InMemoryRepository, count: u64) {
    for id in 1..=count {
        let item = VocabularyItem::new(
            WordId::new(id),
            format!("Wort-{id}"),
            format!("word-{id}"),
            None,
            None,
            None,
            DifficultyTag::Easy,
            MasteryStatus::New,
        )
        .unwrap();
        repo.upsert_item(&item).await.unwrap();
    }
}

fn build_loop(repo: &InMemoryRepository, clock: Clock) -> PracticeLoopService {
    let statistics = Arc::new(StatisticsService::new(
        clock,
        Arc::new(repo.clone()),
        Arc::new(InMemoryStatsCache::new()),
    ));
    let achievements = Arc::new(AchievementService::new(Arc::new(repo.clone())));
    PracticeLoopService::new(
        clock,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        statistics,
        achievements,
    )
}

fn unshuffled(word_count: u32) -> SessionConfig {
    SessionConfig {
        shuffle_words: false,
        ..SessionConfig::quick(word_count)
    }
}

fn answer(is_correct: bool, rating: Option<Rating>) -> Answer {
    Answer {
        user_answer: "Antwort".to_string(),
        is_correct,
        time_spent_seconds: 6,
        rating,
    }
}

#[tokio::test]
async fn full_flow_records_session_and_updates_mastery() {
    let repo = InMemoryRepository::new();
    seed_words(&repo, 6).await;
    let loop_svc = build_loop(&repo, fixed_clock());

    let session = loop_svc
        .start_session(SessionType::Flashcard, unshuffled(5))
        .await
        .unwrap();
    assert_eq!(session.total_words(), 5);

    let outcomes = [true, true, false, true, false];
    let mut completed = false;
    for is_correct in outcomes {
        let result = loop_svc
            .submit_answer(answer(is_correct, Some(Rating::Good)))
            .await
            .unwrap();
        assert!(result.accepted);
        completed = result.completed_session;
    }
    assert!(completed);

    let outcome = loop_svc.finalize().await.unwrap().expect("durable record");
    assert_eq!(outcome.record.score(), 60);
    assert_eq!(outcome.record.word_results().len(), 5);
    assert_eq!(outcome.stats.total_sessions, 1);

    let ids: Vec<&str> = outcome
        .newly_unlocked
        .iter()
        .map(|u| u.id.as_str())
        .collect();
    assert!(ids.contains(&"first_session"));

    // Mastery counters and review times landed on the words.
    let mastery = repo.mastery(WordId::new(1)).await.unwrap();
    assert_eq!(mastery.practice_count(), 1);
    assert_eq!(mastery.accuracy(), 100);
    assert_eq!(mastery.status(), MasteryStatus::Learning);
    assert_eq!(
        repo.next_review_at(WordId::new(1)).unwrap(),
        Some(fixed_now() + chrono::Duration::days(4))
    );

    // The resume snapshot is gone once the session is durable.
    assert_eq!(repo.get().await.unwrap(), None);
    assert!(!loop_svc.has_resumable().await);
}

#[tokio::test]
async fn snapshot_survives_a_restart_and_resumes_mid_session() {
    let repo = InMemoryRepository::new();
    seed_words(&repo, 5).await;

    {
        let loop_svc = build_loop(&repo, fixed_clock());
        loop_svc
            .start_session(SessionType::MultipleChoice, unshuffled(5))
            .await
            .unwrap();
        loop_svc.submit_answer(answer(true, None)).await.unwrap();
        loop_svc.submit_answer(answer(false, None)).await.unwrap();
    }

    // A fresh service over the same storage sees the snapshot.
    let restarted = build_loop(&repo, fixed_clock());
    assert!(restarted.has_resumable().await);

    let resumed = restarted
        .resume_session()
        .await
        .unwrap()
        .expect("resumable snapshot");
    assert_eq!(resumed.session_type(), SessionType::MultipleChoice);
    assert_eq!(resumed.current_index(), 2);
    assert_eq!(resumed.correct_answers(), 1);

    // The run continues where it left off.
    for _ in 0..3 {
        restarted.submit_answer(answer(true, None)).await.unwrap();
    }
    let outcome = restarted.finalize().await.unwrap().unwrap();
    assert_eq!(outcome.record.score(), 80);
}

#[tokio::test]
async fn duplicate_finalize_is_idempotent() {
    let repo = InMemoryRepository::new();
    seed_words(&repo, 5).await;
    let loop_svc = build_loop(&repo, fixed_clock());

    loop_svc
        .start_session(SessionType::Flashcard, unshuffled(5))
        .await
        .unwrap();
    for _ in 0..5 {
        loop_svc.submit_answer(answer(true, None)).await.unwrap();
    }

    let first = loop_svc.finalize().await.unwrap().unwrap();
    assert!(!first.newly_unlocked.is_empty());

    // Retrying after success replays nothing: same record, no new unlocks,
    // no extra mastery applications.
    let second = loop_svc.finalize().await.unwrap().unwrap();
    assert_eq!(second.record_id, first.record_id);
    assert!(second.newly_unlocked.is_empty());
    assert_eq!(second.stats.total_sessions, 1);

    let mastery = repo.mastery(WordId::new(1)).await.unwrap();
    assert_eq!(mastery.practice_count(), 1);
}

#[tokio::test]
async fn tick_reports_time_limit_and_noops_after_reset() {
    let repo = InMemoryRepository::new();
    seed_words(&repo, 5).await;
    let loop_svc = build_loop(&repo, fixed_clock());

    let config = SessionConfig {
        time_limit_seconds: Some(0),
        ..unshuffled(5)
    };
    loop_svc
        .start_session(SessionType::FillBlanks, config)
        .await
        .unwrap();

    // The start snapshot is fresh, so the cadence is not due; the zero-second
    // limit has already run out.
    let tick = loop_svc.tick().await;
    assert!(!tick.saved);
    assert!(tick.time_limit_exceeded);

    // A stray timer callback after reset observes nothing and does nothing.
    loop_svc.reset().await.unwrap();
    let after_reset = loop_svc.tick().await;
    assert!(!after_reset.saved);
    assert!(!after_reset.time_limit_exceeded);
    assert_eq!(repo.get().await.unwrap(), None);
}

#[tokio::test]
async fn tick_noops_once_the_session_is_complete() {
    let repo = InMemoryRepository::new();
    seed_words(&repo, 5).await;
    let loop_svc = build_loop(&repo, fixed_clock());

    loop_svc
        .start_session(SessionType::Listening, unshuffled(5))
        .await
        .unwrap();
    for _ in 0..5 {
        loop_svc.submit_answer(answer(true, None)).await.unwrap();
    }

    let tick = loop_svc.tick().await;
    assert_eq!(tick, services::TickOutcome::default());
}

#[tokio::test]
async fn paused_session_rejects_answers_until_resumed() {
    let repo = InMemoryRepository::new();
    seed_words(&repo, 5).await;
    let loop_svc = build_loop(&repo, fixed_clock());

    loop_svc
        .start_session(SessionType::Flashcard, unshuffled(5))
        .await
        .unwrap();
    assert!(loop_svc.pause().unwrap());

    let rejected = loop_svc.submit_answer(answer(true, None)).await.unwrap();
    assert!(!rejected.accepted);
    assert_eq!(rejected.progress.answered, 0);

    assert!(loop_svc.resume().unwrap());
    let accepted = loop_svc.submit_answer(answer(true, None)).await.unwrap();
    assert!(accepted.accepted);
    assert_eq!(accepted.progress.answered, 1);
}

#[tokio::test]
async fn start_session_guards_reject_bad_requests() {
    let repo = InMemoryRepository::new();
    let loop_svc = build_loop(&repo, fixed_clock());

    // Below the minimum session size.
    let err = loop_svc
        .start_session(SessionType::Flashcard, unshuffled(3))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::WordCountTooSmall { provided: 3, min: 5 }
    ));

    // Nothing matches the filters.
    let err = loop_svc
        .start_session(SessionType::Flashcard, unshuffled(5))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::EmptyPool));

    // A second start while a run is active is a programmer error.
    seed_words(&repo, 5).await;
    loop_svc
        .start_session(SessionType::Flashcard, unshuffled(5))
        .await
        .unwrap();
    let err = loop_svc
        .start_session(SessionType::Flashcard, unshuffled(5))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::AlreadyActive));
}

#[tokio::test]
async fn finalize_before_completion_is_rejected() {
    let repo = InMemoryRepository::new();
    seed_words(&repo, 5).await;
    let loop_svc = build_loop(&repo, fixed_clock());

    loop_svc
        .start_session(SessionType::Flashcard, unshuffled(5))
        .await
        .unwrap();
    loop_svc.submit_answer(answer(true, None)).await.unwrap();

    assert!(matches!(
        loop_svc.finalize().await.unwrap_err(),
        SessionError::NotComplete
    ));

    // The in-memory run is untouched by the failed attempt.
    let session = loop_svc.active_session().unwrap().unwrap();
    assert_eq!(session.current_index(), 1);
    assert!(!session.is_complete());
}
