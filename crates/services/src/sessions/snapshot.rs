use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::warn;

use storage::repository::ProgressStore;
use vocab_core::Clock;
use vocab_core::model::EngineSettings;

use super::service::PracticeSession;

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Durable snapshot of an in-progress session.
///
/// At most one exists per client; a snapshot that is stale (older than the
/// TTL) or already complete is not resumable and is discarded on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub session: PracticeSession,
    pub last_saved_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SnapshotWriteView<'a> {
    session: &'a PracticeSession,
    last_saved_at: DateTime<Utc>,
}

//
// ─── KEEPER ────────────────────────────────────────────────────────────────────
//

/// Best-effort persistence of in-progress session state.
///
/// Saves are fire-and-forget: an interim snapshot that fails to write is a
/// bounded loss, so I/O and serialization problems are logged and swallowed
/// rather than surfaced into the session flow.
pub struct SnapshotKeeper {
    clock: Clock,
    store: Arc<dyn ProgressStore>,
    ttl: Duration,
    autosave_interval: Duration,
    last_saved_at: Mutex<Option<DateTime<Utc>>>,
}

impl SnapshotKeeper {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn ProgressStore>, settings: &EngineSettings) -> Self {
        Self {
            clock,
            store,
            ttl: settings.snapshot_ttl(),
            autosave_interval: settings.autosave_interval(),
            last_saved_at: Mutex::new(None),
        }
    }

    /// Persist a snapshot of the session with `last_saved_at = now`.
    pub async fn save(&self, session: &PracticeSession) {
        let now = self.clock.now();
        let view = SnapshotWriteView {
            session,
            last_saved_at: now,
        };

        let blob = match serde_json::to_string(&view) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(error = %err, "failed to serialize progress snapshot");
                return;
            }
        };

        match self.store.set(&blob).await {
            Ok(()) => {
                if let Ok(mut guard) = self.last_saved_at.lock() {
                    *guard = Some(now);
                }
            }
            Err(err) => warn!(error = %err, "failed to write progress snapshot"),
        }
    }

    /// Load the stored snapshot, discarding it when it is stale, already
    /// complete, or unreadable.
    ///
    /// Two loads without an intervening save return equal snapshots.
    pub async fn load(&self) -> Option<ProgressSnapshot> {
        let blob = match self.store.get().await {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "failed to read progress snapshot");
                return None;
            }
        };

        let snapshot: ProgressSnapshot = match serde_json::from_str(&blob) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "discarding unreadable progress snapshot");
                self.clear().await;
                return None;
            }
        };

        let now = self.clock.now();
        if snapshot.session.is_complete() || now - snapshot.last_saved_at > self.ttl {
            self.clear().await;
            return None;
        }

        Some(snapshot)
    }

    /// Whether a resumable snapshot exists, clearing stale state on the way.
    pub async fn has_resumable(&self) -> bool {
        self.load().await.is_some()
    }

    /// Delete the stored snapshot unconditionally.
    pub async fn clear(&self) {
        if let Err(err) = self.store.delete().await {
            warn!(error = %err, "failed to clear progress snapshot");
        }
        if let Ok(mut guard) = self.last_saved_at.lock() {
            *guard = None;
        }
    }

    /// Cadence check: true when enough time has passed since the last
    /// successful save. Not a blind timer write; the tick path calls this
    /// before touching storage.
    #[must_use]
    pub fn autosave_due(&self, now: DateTime<Utc>) -> bool {
        let last = self.last_saved_at.lock().ok().and_then(|guard| *guard);
        match last {
            Some(at) => now - at >= self.autosave_interval,
            None => true,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
