//! Lafzize submission.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tilawah_core::RecitationFile;

use super::error::ApiResult;
use super::middleware::AuthUser;
use crate::state::AppState;

/// Start a lafzize job for one of the caller's files
///
/// Answers as soon as the file is claimed. The job runs detached; poll the
/// file to see it finish.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path((slug, verse_key)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<RecitationFile>)> {
    let submission = state.lafzize().submit(&identity, &slug, &verse_key).await?;
    Ok((StatusCode::ACCEPTED, Json(submission.file)))
}
