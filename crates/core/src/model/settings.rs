use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("minimum session size must be > 0")]
    InvalidMinSessionWords,

    #[error("mastery accuracy threshold must be between 1 and 100")]
    InvalidAccuracyThreshold,

    #[error("mastery minimum attempts must be > 0")]
    InvalidMinAttempts,

    #[error("autosave interval must be > 0 seconds")]
    InvalidAutosaveInterval,

    #[error("snapshot TTL must be > 0 hours")]
    InvalidSnapshotTtl,

    #[error("interval days must be strictly increasing from again to easy")]
    InvalidIntervalLadder,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Policy constants for the practice engine.
///
/// The streak, mastery, and interval numbers are deliberate product choices,
/// so they live here as explicit configuration rather than inside the
/// algorithms that consume them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    min_session_words: u32,
    mastery_accuracy_threshold: u32,
    mastery_min_attempts: u32,
    autosave_interval_secs: u32,
    snapshot_ttl_hours: u32,
    again_interval_days: u32,
    hard_interval_days: u32,
    good_interval_days: u32,
    easy_interval_days: u32,
}

impl EngineSettings {
    /// Creates the stock engine settings.
    ///
    /// - at least 5 words per session
    /// - mastered at >= 80% accuracy over >= 3 attempts
    /// - autosave every 30 seconds while a session is active
    /// - resume snapshots expire after 24 hours
    /// - review offsets of 1/2/4/7 days for again/hard/good/easy
    #[must_use]
    pub fn default_engine() -> Self {
        Self {
            min_session_words: 5,
            mastery_accuracy_threshold: 80,
            mastery_min_attempts: 3,
            autosave_interval_secs: 30,
            snapshot_ttl_hours: 24,
            again_interval_days: 1,
            hard_interval_days: 2,
            good_interval_days: 4,
            easy_interval_days: 7,
        }
    }

    /// Creates custom engine settings.
    ///
    /// # Errors
    ///
    /// Returns an error when any count is zero, the accuracy threshold is not
    /// in 1..=100, or the interval ladder is not strictly increasing.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        min_session_words: u32,
        mastery_accuracy_threshold: u32,
        mastery_min_attempts: u32,
        autosave_interval_secs: u32,
        snapshot_ttl_hours: u32,
        again_interval_days: u32,
        hard_interval_days: u32,
        good_interval_days: u32,
        easy_interval_days: u32,
    ) -> Result<Self, SettingsError> {
        if min_session_words == 0 {
            return Err(SettingsError::InvalidMinSessionWords);
        }
        if mastery_accuracy_threshold == 0 || mastery_accuracy_threshold > 100 {
            return Err(SettingsError::InvalidAccuracyThreshold);
        }
        if mastery_min_attempts == 0 {
            return Err(SettingsError::InvalidMinAttempts);
        }
        if autosave_interval_secs == 0 {
            return Err(SettingsError::InvalidAutosaveInterval);
        }
        if snapshot_ttl_hours == 0 {
            return Err(SettingsError::InvalidSnapshotTtl);
        }
        if !(again_interval_days < hard_interval_days
            && hard_interval_days < good_interval_days
            && good_interval_days < easy_interval_days)
        {
            return Err(SettingsError::InvalidIntervalLadder);
        }

        Ok(Self {
            min_session_words,
            mastery_accuracy_threshold,
            mastery_min_attempts,
            autosave_interval_secs,
            snapshot_ttl_hours,
            again_interval_days,
            hard_interval_days,
            good_interval_days,
            easy_interval_days,
        })
    }

    // Accessors
    #[must_use]
    pub fn min_session_words(&self) -> u32 {
        self.min_session_words
    }

    #[must_use]
    pub fn mastery_accuracy_threshold(&self) -> u32 {
        self.mastery_accuracy_threshold
    }

    #[must_use]
    pub fn mastery_min_attempts(&self) -> u32 {
        self.mastery_min_attempts
    }

    #[must_use]
    pub fn autosave_interval_secs(&self) -> u32 {
        self.autosave_interval_secs
    }

    #[must_use]
    pub fn snapshot_ttl_hours(&self) -> u32 {
        self.snapshot_ttl_hours
    }

    #[must_use]
    pub fn again_interval_days(&self) -> u32 {
        self.again_interval_days
    }

    #[must_use]
    pub fn hard_interval_days(&self) -> u32 {
        self.hard_interval_days
    }

    #[must_use]
    pub fn good_interval_days(&self) -> u32 {
        self.good_interval_days
    }

    #[must_use]
    pub fn easy_interval_days(&self) -> u32 {
        self.easy_interval_days
    }

    #[must_use]
    pub fn autosave_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.autosave_interval_secs))
    }

    #[must_use]
    pub fn snapshot_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.snapshot_ttl_hours))
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::default_engine()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
