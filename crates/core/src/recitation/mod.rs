//! Recitations and their per-verse audio files.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteRecitationStore;
pub use store::{RecitationError, RecitationStore};
pub use types::{
    validate_slug, validate_verse_key, Claim, FileKey, Recitation, RecitationFile, Segment, Timing,
};
