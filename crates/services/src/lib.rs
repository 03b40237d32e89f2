#![forbid(unsafe_code)]

pub mod achievement_service;
pub mod app_services;
pub mod error;
pub mod sessions;
pub mod stats_service;
pub mod sync;

pub use vocab_core::Clock;
pub use sessions as session;

pub use error::{AppServicesError, SessionError, SyncError};

pub use achievement_service::{AchievementService, UnlockedAchievement};
pub use app_services::PracticeServices;
pub use sessions::{
    Answer, FinalizeOutcome, PracticeLoopService, PracticeSession, PracticeWord, ProgressSnapshot,
    SessionAnswerResult, SessionConfig, SessionProgress, SnapshotKeeper, TickOutcome,
};
pub use stats_service::{InMemoryStatsCache, StatisticsService, StatsCache};
pub use sync::{SyncClient, SyncConfig};
