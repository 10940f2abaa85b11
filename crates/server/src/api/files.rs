//! Recitation file API handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tilawah_core::{FileKey, RecitationFile};

use super::error::{ApiError, ApiResult};
use super::middleware::AuthUser;
use crate::state::AppState;

/// Upload the audio of one verse
///
/// Multipart fields: `file` (the audio, any format ffmpeg reads) and
/// `verse_key`.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(slug): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<RecitationFile>)> {
    let mut audio: Option<Vec<u8>> = None;
    let mut verse_key: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(ApiError::new(e.status(), e.body_text())),
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                audio = Some(bytes.to_vec());
            }
            "verse_key" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                verse_key = Some(text.trim().to_string());
            }
            _ => {}
        }
    }

    let audio = audio.ok_or_else(|| ApiError::bad_request("Missing multipart field 'file'"))?;
    let verse_key =
        verse_key.ok_or_else(|| ApiError::bad_request("Missing multipart field 'verse_key'"))?;

    let max = state.config().storage.max_upload_bytes;
    if audio.len() > max {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Audio exceeds the {} byte upload limit", max),
        ));
    }

    let file = state
        .uploads()
        .upload(&identity, &slug, &verse_key, &audio)
        .await?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// List the files of a recitation
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Path((reciter, slug)): Path<(String, String)>,
) -> ApiResult<Json<Vec<RecitationFile>>> {
    if state.recitations().get_recitation(&reciter, &slug)?.is_none() {
        return Err(ApiError::not_found(format!(
            "Recitation not found: {}/{}",
            reciter, slug
        )));
    }
    Ok(Json(state.recitations().list_files(&reciter, &slug)?))
}

/// Get one file. The flags are returned as stored; `has_timings` is only
/// meaningful while `lafzize_processing` is false.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path((reciter, slug, verse_key)): Path<(String, String, String)>,
) -> ApiResult<Json<RecitationFile>> {
    let key = FileKey::new(reciter, slug, verse_key);
    state
        .recitations()
        .get_file(&key)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Recitation file not found: {}", key)))
}

/// Delete one of the caller's files with its audio and timings
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path((slug, verse_key)): Path<(String, String)>,
) -> ApiResult<Json<RecitationFile>> {
    let file = state.uploads().delete(&identity, &slug, &verse_key).await?;
    Ok(Json(file))
}
