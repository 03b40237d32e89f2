use vocab_core::model::{DifficultyTag, MasteryStatus, SessionType, WordId};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn word_id_from_i64(v: i64) -> Result<WordId, StorageError> {
    u64::try_from(v)
        .map(WordId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid word id: {v}")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn difficulty_from_str(v: &str) -> Result<DifficultyTag, StorageError> {
    DifficultyTag::parse(v).map_err(ser)
}

pub(crate) fn status_from_str(v: &str) -> Result<MasteryStatus, StorageError> {
    MasteryStatus::parse(v).map_err(ser)
}

pub(crate) fn session_type_from_str(v: &str) -> Result<SessionType, StorageError> {
    SessionType::parse(v).map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_id_rejects_negative() {
        assert!(word_id_from_i64(-1).is_err());
        assert_eq!(word_id_from_i64(7).unwrap(), WordId::new(7));
    }

    #[test]
    fn numeric_narrowing_is_checked() {
        assert!(u32_from_i64("count", -1).is_err());
        assert!(u8_from_i64("score", 300).is_err());
        assert_eq!(u8_from_i64("score", 100).unwrap(), 100);
    }

    #[test]
    fn enum_names_map_back() {
        assert_eq!(
            difficulty_from_str("medium").unwrap(),
            DifficultyTag::Medium
        );
        assert_eq!(status_from_str("mastered").unwrap(), MasteryStatus::Mastered);
        assert_eq!(
            session_type_from_str("fill_blanks").unwrap(),
            SessionType::FillBlanks
        );
        assert!(session_type_from_str("bogus").is_err());
    }
}
