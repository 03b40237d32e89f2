use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{DifficultyTag, WordId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordError {
    #[error("score must be at most 100, got {0}")]
    InvalidScore(u8),

    #[error("a finalized session must contain at least one word result")]
    NoWordResults,

    #[error("unknown session type: {0}")]
    UnknownSessionType(String),
}

//
// ─── SESSION TYPE ──────────────────────────────────────────────────────────────
//

/// The quiz mode a session was run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Flashcard,
    MultipleChoice,
    FillBlanks,
    Listening,
    Mixed,
}

impl SessionType {
    /// All session types, in a stable order (used by aggregation buckets).
    pub const ALL: [SessionType; 5] = [
        SessionType::Flashcard,
        SessionType::MultipleChoice,
        SessionType::FillBlanks,
        SessionType::Listening,
        SessionType::Mixed,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Flashcard => "flashcard",
            SessionType::MultipleChoice => "multiple_choice",
            SessionType::FillBlanks => "fill_blanks",
            SessionType::Listening => "listening",
            SessionType::Mixed => "mixed",
        }
    }

    /// Parses a stable storage name back into a session type.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::UnknownSessionType` for unrecognized names.
    pub fn parse(name: &str) -> Result<Self, RecordError> {
        match name {
            "flashcard" => Ok(Self::Flashcard),
            "multiple_choice" => Ok(Self::MultipleChoice),
            "fill_blanks" => Ok(Self::FillBlanks),
            "listening" => Ok(Self::Listening),
            "mixed" => Ok(Self::Mixed),
            other => Err(RecordError::UnknownSessionType(other.to_string())),
        }
    }
}

//
// ─── WORD RESULT ───────────────────────────────────────────────────────────────
//

/// Outcome of one word within a finalized session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordResult {
    pub vocabulary_id: WordId,
    pub is_correct: bool,
    pub time_spent_seconds: u32,
    pub attempts: u32,
}

//
// ─── FINALIZED SESSION RECORD ──────────────────────────────────────────────────
//

/// Durable, append-only record of one completed practice session.
///
/// Created exactly once per completed session and never mutated afterwards;
/// the statistics aggregator reads these as its only input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedSessionRecord {
    session_type: SessionType,
    score: u8,
    time_spent_seconds: u32,
    difficulty: Option<DifficultyTag>,
    word_results: Vec<WordResult>,
    created_at: DateTime<Utc>,
}

impl FinalizedSessionRecord {
    /// Builds a record from a completed session's parts.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidScore` when the score exceeds 100 and
    /// `RecordError::NoWordResults` when the result list is empty.
    pub fn from_parts(
        session_type: SessionType,
        score: u8,
        time_spent_seconds: u32,
        difficulty: Option<DifficultyTag>,
        word_results: Vec<WordResult>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        if score > 100 {
            return Err(RecordError::InvalidScore(score));
        }
        if word_results.is_empty() {
            return Err(RecordError::NoWordResults);
        }

        Ok(Self {
            session_type,
            score,
            time_spent_seconds,
            difficulty,
            word_results,
            created_at,
        })
    }

    /// Rehydrates a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Same validation as [`FinalizedSessionRecord::from_parts`].
    pub fn from_persisted(
        session_type: SessionType,
        score: u8,
        time_spent_seconds: u32,
        difficulty: Option<DifficultyTag>,
        word_results: Vec<WordResult>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        Self::from_parts(
            session_type,
            score,
            time_spent_seconds,
            difficulty,
            word_results,
            created_at,
        )
    }

    #[must_use]
    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn time_spent_seconds(&self) -> u32 {
        self.time_spent_seconds
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<DifficultyTag> {
        self.difficulty
    }

    #[must_use]
    pub fn word_results(&self) -> &[WordResult] {
        &self.word_results
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of correctly answered words in this record.
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.word_results.iter().filter(|w| w.is_correct).count()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
