use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::recitation::{FileKey, RecitationError};
use crate::transcoder::TranscodeError;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Invalid(String),

    #[error("Recitation not found: {0}")]
    RecitationNotFound(String),

    #[error("Recitation file not found: {0}")]
    FileNotFound(FileKey),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<RecitationError> for UploadError {
    fn from(e: RecitationError) -> Self {
        match e {
            RecitationError::NotFound(label) => UploadError::RecitationNotFound(label),
            RecitationError::FileNotFound(key) => UploadError::FileNotFound(key),
            RecitationError::AlreadyExists(label) => UploadError::AlreadyExists(label),
            RecitationError::Invalid(msg) => UploadError::Invalid(msg),
            other => UploadError::Store(other.to_string()),
        }
    }
}
