//! Recitation storage trait and error type.

use thiserror::Error;

use super::{Claim, FileKey, Recitation, RecitationFile};
use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum RecitationError {
    #[error("Recitation not found: {0}")]
    NotFound(String),

    #[error("Recitation file not found: {0}")]
    FileNotFound(FileKey),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The file's processing flag is already set.
    #[error("Recitation file is being processed: {0}")]
    InProgress(FileKey),

    /// A release was attempted without holding the current claim.
    #[error("Recitation file is not claimed by this caller: {0}")]
    NotClaimed(FileKey),

    #[error("{0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DatabaseError> for RecitationError {
    fn from(e: DatabaseError) -> Self {
        RecitationError::Database(e.0)
    }
}

/// Trait for recitation and recitation file storage backends.
///
/// `begin_processing` and `finish_processing` are the only operations that
/// change a file's flags. Each is a single conditional update, so two
/// callers racing to claim the same file cannot both succeed.
pub trait RecitationStore: Send + Sync {
    /// Create a recitation. The name defaults to the slug.
    fn create_recitation(
        &self,
        reciter: &str,
        slug: &str,
        name: Option<&str>,
    ) -> Result<Recitation, RecitationError>;

    fn get_recitation(&self, reciter: &str, slug: &str)
        -> Result<Option<Recitation>, RecitationError>;

    fn list_recitations(&self) -> Result<Vec<Recitation>, RecitationError>;

    /// Rename a recitation. `None` or an empty string keeps the current name.
    fn update_recitation_name(
        &self,
        reciter: &str,
        slug: &str,
        name: Option<&str>,
    ) -> Result<Recitation, RecitationError>;

    /// Delete a recitation and, by cascade, all of its files.
    fn delete_recitation(&self, reciter: &str, slug: &str) -> Result<Recitation, RecitationError>;

    /// Insert a file record with both flags clear.
    fn create_file(&self, key: &FileKey) -> Result<RecitationFile, RecitationError>;

    fn get_file(&self, key: &FileKey) -> Result<Option<RecitationFile>, RecitationError>;

    fn list_files(&self, reciter: &str, slug: &str)
        -> Result<Vec<RecitationFile>, RecitationError>;

    /// Delete a file record regardless of its flags.
    fn delete_file(&self, key: &FileKey) -> Result<RecitationFile, RecitationError>;

    /// Claim a file: set `lafzize_processing` and clear `has_timings`, but
    /// only if `lafzize_processing` was clear.
    fn begin_processing(&self, key: &FileKey) -> Result<Claim, RecitationError>;

    /// Release a claim: clear `lafzize_processing` and set `has_timings` as
    /// given, but only if the file is still held under `claim_token`.
    fn finish_processing(
        &self,
        key: &FileKey,
        claim_token: &str,
        has_timings: bool,
    ) -> Result<RecitationFile, RecitationError>;

    /// Succeeds only while the file is still held under `claim_token`.
    fn check_claim(&self, key: &FileKey, claim_token: &str) -> Result<(), RecitationError>;

    /// Clear every claim (both flags) and return the files that were claimed.
    fn reset_processing(&self) -> Result<Vec<FileKey>, RecitationError>;
}
