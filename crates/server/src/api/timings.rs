//! Manual timing edits.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tilawah_core::{RecitationFile, Timing};

use super::error::ApiResult;
use super::middleware::AuthUser;
use crate::state::AppState;

/// Replace the timings of one of the caller's files. Answers with the
/// updated file record; the timings are served under `/uploads`.
pub async fn replace_timing(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path((slug, verse_key)): Path<(String, String)>,
    Json(timing): Json<Timing>,
) -> ApiResult<Json<RecitationFile>> {
    let file = state
        .lafzize()
        .replace_timing(&identity, &slug, &verse_key, &timing)
        .await?;
    Ok(Json(file))
}

/// Delete the timings of one of the caller's files. Answers with the
/// updated file record.
pub async fn delete_timing(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path((slug, verse_key)): Path<(String, String)>,
) -> ApiResult<Json<RecitationFile>> {
    let file = state
        .lafzize()
        .remove_timing(&identity, &slug, &verse_key)
        .await?;
    Ok(Json(file))
}
