use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a vocabulary word
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WordId(u64);

impl WordId {
    /// Creates a new `WordId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WordId({})", self.0)
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for parsing an ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for WordId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(WordId::new).map_err(|_| ParseIdError {
            kind: "WordId".to_string(),
        })
    }
}

/// Unique identifier for a practice session.
///
/// Minted when a session starts; keys resume snapshots and guards
/// duplicate finalization of the same run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mints a fresh random session identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID (rehydrating from a snapshot).
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Uuid>()
            .map(SessionId::from_uuid)
            .map_err(|_| ParseIdError {
                kind: "SessionId".to_string(),
            })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
