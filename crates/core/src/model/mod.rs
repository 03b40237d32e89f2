mod ids;
mod rating;
mod record;
mod settings;
mod vocabulary;

pub use ids::{SessionId, WordId};
pub use rating::{Rating, RatingError};
pub use record::{FinalizedSessionRecord, RecordError, SessionType, WordResult};
pub use settings::{EngineSettings, SettingsError};
pub use vocabulary::{
    DifficultyTag, MasteryProgress, MasteryStatus, VocabularyError, VocabularyItem,
};
