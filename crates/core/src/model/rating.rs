use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur when decoding a rating.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("invalid rating value: {0}")]
    InvalidValue(u8),

    #[error("unknown rating name: {0}")]
    UnknownName(String),
}

//
// ─── RATING ───────────────────────────────────────────────────────────────────
//

/// Four-level recall confidence reported by the user after a question.
///
/// The rating drives the next-review interval:
/// - `Again`: failed to recall, word comes back soonest
/// - `Hard`: recalled with significant difficulty
/// - `Good`: recalled correctly with appropriate effort
/// - `Easy`: recalled instantly, longest delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    /// Failed to recall the answer. Word is scheduled soonest.
    Again,
    /// Recalled with significant difficulty.
    Hard,
    /// Recalled correctly with appropriate effort.
    Good,
    /// Recalled instantly. Longest scheduling delay.
    Easy,
}

impl Rating {
    /// Converts a numeric rating (0-3) to a `Rating`.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::InvalidValue` if the value is not in the range 0-3.
    pub fn from_u8(value: u8) -> Result<Self, RatingError> {
        match value {
            0 => Ok(Self::Again),
            1 => Ok(Self::Hard),
            2 => Ok(Self::Good),
            3 => Ok(Self::Easy),
            _ => Err(RatingError::InvalidValue(value)),
        }
    }

    /// Stable storage name for this rating.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }

    /// Parses a stable storage name back into a rating.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::UnknownName` for anything but the four names.
    pub fn parse(name: &str) -> Result<Self, RatingError> {
        match name {
            "again" => Ok(Self::Again),
            "hard" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            "easy" => Ok(Self::Easy),
            other => Err(RatingError::UnknownName(other.to_string())),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
