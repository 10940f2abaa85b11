//! Mapping of domain errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tilawah_core::{
    AccountError, ArtifactError, AuthError, LafzizeError, RecitationError, UploadError,
};
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Logs the detail and hides it from the client.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::NotFound(_) => Self::not_found(e.to_string()),
            AccountError::AlreadyExists(_) => Self::conflict(e.to_string()),
            AccountError::Invalid(_) => Self::bad_request(e.to_string()),
            AccountError::InvalidCredentials => Self::unauthorized(e.to_string()),
            AccountError::Hashing(_) | AccountError::Database(_) => Self::internal(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::ServiceUnavailable(_) => Self::internal(e),
            _ => Self::unauthorized(e.to_string()),
        }
    }
}

impl From<RecitationError> for ApiError {
    fn from(e: RecitationError) -> Self {
        match e {
            RecitationError::NotFound(_) | RecitationError::FileNotFound(_) => {
                Self::not_found(e.to_string())
            }
            RecitationError::AlreadyExists(_) | RecitationError::InProgress(_) => {
                Self::conflict(e.to_string())
            }
            RecitationError::Invalid(_) => Self::bad_request(e.to_string()),
            RecitationError::NotClaimed(_) | RecitationError::Database(_) => Self::internal(e),
        }
    }
}

impl From<ArtifactError> for ApiError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::NotFound { .. } => Self::not_found("File not found"),
            ArtifactError::AlreadyExists { .. } => Self::conflict("File already exists"),
            _ => Self::internal(e),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Invalid(_) | UploadError::Transcode(_) => Self::bad_request(e.to_string()),
            UploadError::RecitationNotFound(_) | UploadError::FileNotFound(_) => {
                Self::not_found(e.to_string())
            }
            UploadError::AlreadyExists(_) => Self::conflict(e.to_string()),
            UploadError::Artifact(_) | UploadError::Store(_) => Self::internal(e),
        }
    }
}

impl From<LafzizeError> for ApiError {
    fn from(e: LafzizeError) -> Self {
        match e {
            LafzizeError::NotFound(_) | LafzizeError::NoTimings(_) => {
                Self::not_found(e.to_string())
            }
            LafzizeError::AlreadyInProgress(_) | LafzizeError::AudioMissing(_) => {
                Self::conflict(e.to_string())
            }
            LafzizeError::Invalid(_) => Self::bad_request(e.to_string()),
            LafzizeError::Artifact(_) | LafzizeError::Store(_) => Self::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilawah_core::FileKey;

    fn key() -> FileKey {
        FileKey::new("alice", "hafs", "1:1")
    }

    #[test]
    fn test_lafzize_error_statuses() {
        assert_eq!(
            ApiError::from(LafzizeError::NotFound(key())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(LafzizeError::AlreadyInProgress(key())).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(LafzizeError::Store("disk I/O error".to_string())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = ApiError::from(RecitationError::Database("no such table".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("no such table"));
    }

    #[test]
    fn test_account_error_statuses() {
        assert_eq!(
            ApiError::from(AccountError::AlreadyExists("alice".to_string())).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AccountError::InvalidCredentials).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AccountError::Invalid("too short".to_string())).status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_upload_error_statuses() {
        let transcode = tilawah_core::TranscodeError::failed("bad codec", None);
        assert_eq!(
            ApiError::from(UploadError::Transcode(transcode)).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(UploadError::AlreadyExists("alice/hafs/1:1".to_string())).status,
            StatusCode::CONFLICT
        );
    }
}
