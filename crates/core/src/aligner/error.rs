use std::path::PathBuf;
use thiserror::Error;

/// Errors talking to the alignment service.
#[derive(Debug, Error)]
pub enum AlignerError {
    #[error("Cannot read audio {path}: {reason}")]
    AudioUnreadable { path: PathBuf, reason: String },

    /// The request never got a response.
    #[error("Request to alignment service failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("Alignment service returned HTTP {status}: {message}")]
    Service { status: u16, message: String },

    /// The response body broke off part way.
    #[error("Alignment response stream failed: {0}")]
    Stream(String),
}
