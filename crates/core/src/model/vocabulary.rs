use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::WordId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VocabularyError {
    #[error("word cannot be empty")]
    EmptyWord,

    #[error("translation cannot be empty")]
    EmptyTranslation,

    #[error("accuracy must be at most 100, got {0}")]
    InvalidAccuracy(u32),

    #[error("unknown difficulty tag: {0}")]
    UnknownDifficulty(String),

    #[error("unknown mastery status: {0}")]
    UnknownStatus(String),
}

//
// ─── DIFFICULTY & MASTERY ──────────────────────────────────────────────────────
//

/// Coarse editorial difficulty label on a vocabulary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTag {
    Easy,
    Medium,
    Hard,
}

impl DifficultyTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyTag::Easy => "easy",
            DifficultyTag::Medium => "medium",
            DifficultyTag::Hard => "hard",
        }
    }

    /// Parses a stable storage name back into a tag.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError::UnknownDifficulty` for unrecognized names.
    pub fn parse(name: &str) -> Result<Self, VocabularyError> {
        match name {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(VocabularyError::UnknownDifficulty(other.to_string())),
        }
    }
}

/// Coarse label summarizing a word's practice history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryStatus {
    New,
    Learning,
    Mastered,
}

impl MasteryStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MasteryStatus::New => "new",
            MasteryStatus::Learning => "learning",
            MasteryStatus::Mastered => "mastered",
        }
    }

    /// Parses a stable storage name back into a status.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError::UnknownStatus` for unrecognized names.
    pub fn parse(name: &str) -> Result<Self, VocabularyError> {
        match name {
            "new" => Ok(Self::New),
            "learning" => Ok(Self::Learning),
            "mastered" => Ok(Self::Mastered),
            other => Err(VocabularyError::UnknownStatus(other.to_string())),
        }
    }
}

//
// ─── VOCABULARY ITEM ───────────────────────────────────────────────────────────
//

/// A single vocabulary entry as provided by the vocabulary source.
///
/// Read-only to the practice engine; only the mastery update path mutates
/// the stored `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    id: WordId,
    word: String,
    translation: String,
    definition: Option<String>,
    example: Option<String>,
    pronunciation: Option<String>,
    difficulty: DifficultyTag,
    status: MasteryStatus,
}

impl VocabularyItem {
    /// Creates a new vocabulary item.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError::EmptyWord` / `EmptyTranslation` if either
    /// text is empty or whitespace-only.
    pub fn new(
        id: WordId,
        word: impl Into<String>,
        translation: impl Into<String>,
        definition: Option<String>,
        example: Option<String>,
        pronunciation: Option<String>,
        difficulty: DifficultyTag,
        status: MasteryStatus,
    ) -> Result<Self, VocabularyError> {
        let word = word.into();
        if word.trim().is_empty() {
            return Err(VocabularyError::EmptyWord);
        }
        let translation = translation.into();
        if translation.trim().is_empty() {
            return Err(VocabularyError::EmptyTranslation);
        }

        Ok(Self {
            id,
            word: word.trim().to_owned(),
            translation: translation.trim().to_owned(),
            definition: definition.filter(|d| !d.trim().is_empty()),
            example: example.filter(|e| !e.trim().is_empty()),
            pronunciation: pronunciation.filter(|p| !p.trim().is_empty()),
            difficulty,
            status,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> WordId {
        self.id
    }

    #[must_use]
    pub fn word(&self) -> &str {
        &self.word
    }

    #[must_use]
    pub fn translation(&self) -> &str {
        &self.translation
    }

    #[must_use]
    pub fn definition(&self) -> Option<&str> {
        self.definition.as_deref()
    }

    #[must_use]
    pub fn example(&self) -> Option<&str> {
        self.example.as_deref()
    }

    #[must_use]
    pub fn pronunciation(&self) -> Option<&str> {
        self.pronunciation.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> DifficultyTag {
        self.difficulty
    }

    #[must_use]
    pub fn status(&self) -> MasteryStatus {
        self.status
    }
}

//
// ─── MASTERY PROGRESS ──────────────────────────────────────────────────────────
//

/// Per-word running mastery statistics.
///
/// `accuracy` is a weighted running average over all recorded results,
/// expressed in whole percent. The status transition is a one-way ratchet:
/// this path never downgrades `Mastered` back to `Learning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteryProgress {
    accuracy: u32,
    practice_count: u32,
    status: MasteryStatus,
}

impl MasteryProgress {
    /// Mastery state for a word that has never been practiced.
    #[must_use]
    pub fn untouched() -> Self {
        Self {
            accuracy: 0,
            practice_count: 0,
            status: MasteryStatus::New,
        }
    }

    /// Rehydrates mastery state from storage.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError::InvalidAccuracy` when accuracy exceeds 100.
    pub fn from_persisted(
        accuracy: u32,
        practice_count: u32,
        status: MasteryStatus,
    ) -> Result<Self, VocabularyError> {
        if accuracy > 100 {
            return Err(VocabularyError::InvalidAccuracy(accuracy));
        }
        Ok(Self {
            accuracy,
            practice_count,
            status,
        })
    }

    /// Folds one practice result into the running average and re-derives status.
    ///
    /// `new_accuracy = round((accuracy * count + (correct ? 100 : 0)) / (count + 1))`.
    /// Promotion to `Mastered` requires the accuracy threshold and the minimum
    /// attempt count; any practiced word that is not mastered is `Learning`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn record_result(
        self,
        is_correct: bool,
        accuracy_threshold: u32,
        min_attempts: u32,
    ) -> Self {
        let earned: f64 = if is_correct { 100.0 } else { 0.0 };
        let count = self.practice_count.saturating_add(1);
        let accuracy = ((f64::from(self.accuracy) * f64::from(self.practice_count) + earned)
            / f64::from(count))
        .round() as u32;

        let status = if self.status == MasteryStatus::Mastered {
            MasteryStatus::Mastered
        } else if accuracy >= accuracy_threshold && count >= min_attempts {
            MasteryStatus::Mastered
        } else {
            MasteryStatus::Learning
        };

        Self {
            accuracy,
            practice_count: count,
            status,
        }
    }

    #[must_use]
    pub fn accuracy(&self) -> u32 {
        self.accuracy
    }

    #[must_use]
    pub fn practice_count(&self) -> u32 {
        self.practice_count
    }

    #[must_use]
    pub fn status(&self) -> MasteryStatus {
        self.status
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
