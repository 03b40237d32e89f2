use chrono::{DateTime, Duration, Utc};

use crate::model::{EngineSettings, Rating};

//
// ─── INTERVAL POLICY ───────────────────────────────────────────────────────────
//

/// Maps a recall rating to the delay before the word is reviewed again.
///
/// Pure and total: `Again -> 1 day`, `Hard -> 2`, `Good -> 4`, `Easy -> 7`
/// under the stock settings. A coarse four-bucket approximation of spaced
/// repetition; the only contract downstream code relies on is that the
/// resulting delays are strictly ordered `again < hard < good < easy`.
#[must_use]
pub fn review_offset(rating: Rating, settings: &EngineSettings) -> Duration {
    let days = match rating {
        Rating::Again => settings.again_interval_days(),
        Rating::Hard => settings.hard_interval_days(),
        Rating::Good => settings.good_interval_days(),
        Rating::Easy => settings.easy_interval_days(),
    };
    Duration::days(i64::from(days))
}

/// Absolute next-review timestamp for a rating given at `now`.
#[must_use]
pub fn next_review_at(rating: Rating, settings: &EngineSettings, now: DateTime<Utc>) -> DateTime<Utc> {
    now + review_offset(rating, settings)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
