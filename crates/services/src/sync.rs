use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use storage::repository::MasteryUpdate;
use vocab_core::model::FinalizedSessionRecord;

use crate::error::SyncError;

/// Connection settings for the remote practice backend.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl SyncConfig {
    /// Read sync settings from the environment; `None` when the base URL is
    /// unset (sync stays disabled).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("VOCAB_SYNC_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let api_key = env::var("VOCAB_SYNC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        Some(Self { base_url, api_key })
    }
}

/// Pushes finalized sessions and per-word mastery results to a remote backend.
///
/// Optional mirror of the local durable store: a finalize endpoint failure is
/// a hard error for the caller to retry, while mastery pushes are
/// per-word fire-and-forget.
#[derive(Clone)]
pub struct SyncClient {
    client: Client,
    config: Option<SyncConfig>,
}

impl SyncClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(SyncConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<SyncConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<(String, &SyncConfig), SyncError> {
        let config = self.config.as_ref().ok_or(SyncError::Disabled)?;
        let url = format!("{}/{path}", config.base_url.trim_end_matches('/'));
        Ok((url, config))
    }

    /// Push one finalized session record, returning the remote record id.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Disabled` when unconfigured, `HttpStatus` for any
    /// non-success response (the caller retries finalize sync explicitly),
    /// and `Http` for transport failures.
    pub async fn push_record(&self, record: &FinalizedSessionRecord) -> Result<i64, SyncError> {
        let (url, config) = self.endpoint("practice-sessions")?;

        let payload = RecordPayload::from_record(record);
        let mut request = self.client.post(url).json(&payload);
        if let Some(key) = &config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SyncError::HttpStatus(response.status()));
        }

        let body: StoredRecordResponse = response.json().await?;
        Ok(body.id)
    }

    /// Push one word's mastery result.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Disabled` when unconfigured, `HttpStatus` for any
    /// non-success response, and `Http` for transport failures.
    pub async fn push_mastery(&self, update: &MasteryUpdate) -> Result<(), SyncError> {
        let (url, config) = self.endpoint(&format!(
            "vocabulary/{}/mastery",
            update.vocabulary_id.value()
        ))?;

        let payload = MasteryPayload {
            vocabulary_id: update.vocabulary_id.value(),
            is_correct: update.is_correct,
            attempts: update.attempts,
            time_spent_seconds: update.time_spent_seconds,
        };

        let mut request = self.client.post(url).json(&payload);
        if let Some(key) = &config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SyncError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordPayload {
    session_type: &'static str,
    score: u8,
    time_spent_seconds: u32,
    difficulty: Option<&'static str>,
    word_results: Vec<WordResultPayload>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl RecordPayload {
    fn from_record(record: &FinalizedSessionRecord) -> Self {
        Self {
            session_type: record.session_type().as_str(),
            score: record.score(),
            time_spent_seconds: record.time_spent_seconds(),
            difficulty: record.difficulty().map(|d| d.as_str()),
            word_results: record
                .word_results()
                .iter()
                .map(|w| WordResultPayload {
                    vocabulary_id: w.vocabulary_id.value(),
                    is_correct: w.is_correct,
                    time_spent_seconds: w.time_spent_seconds,
                    attempts: w.attempts,
                })
                .collect(),
            created_at: record.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WordResultPayload {
    vocabulary_id: u64,
    is_correct: bool,
    time_spent_seconds: u32,
    attempts: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MasteryPayload {
    vocabulary_id: u64,
    is_correct: bool,
    attempts: u32,
    time_spent_seconds: u32,
}

#[derive(Debug, Deserialize)]
struct StoredRecordResponse {
    id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_client_is_disabled() {
        let client = SyncClient::new(None);
        assert!(!client.enabled());
    }

    #[tokio::test]
    async fn disabled_client_rejects_pushes() {
        let client = SyncClient::new(None);
        let update = MasteryUpdate {
            vocabulary_id: vocab_core::model::WordId::new(1),
            is_correct: true,
            attempts: 1,
            time_spent_seconds: 3,
        };
        assert!(matches!(
            client.push_mastery(&update).await,
            Err(SyncError::Disabled)
        ));
    }
}
