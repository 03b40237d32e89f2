#![forbid(unsafe_code)]

pub mod achievements;
pub mod interval;
pub mod model;
pub mod stats;
pub mod time;

pub use time::Clock;

pub use achievements::AchievementRule;
pub use stats::{PracticeStatistics, compute_stats};
