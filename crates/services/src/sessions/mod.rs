mod progress;
mod service;
mod snapshot;
mod workflow;

pub use progress::SessionProgress;
pub use service::{Answer, PracticeSession, PracticeWord, SessionConfig};
pub use snapshot::{ProgressSnapshot, SnapshotKeeper};
pub use workflow::{FinalizeOutcome, PracticeLoopService, SessionAnswerResult, TickOutcome};
