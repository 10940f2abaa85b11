//! Recitation API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tilawah_core::Recitation;
use tracing::{info, warn};

use super::error::{ApiError, ApiResult};
use super::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRecitationBody {
    pub slug: String,
    /// Defaults to the slug
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecitationBody {
    pub name: Option<String>,
}

/// Create a recitation owned by the caller
pub async fn create_recitation(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Json(body): Json<CreateRecitationBody>,
) -> ApiResult<(StatusCode, Json<Recitation>)> {
    let recitation = state.recitations().create_recitation(
        &identity.username,
        &body.slug,
        body.name.as_deref(),
    )?;
    info!(reciter = %recitation.reciter, slug = %recitation.slug, "Recitation created");
    Ok((StatusCode::CREATED, Json(recitation)))
}

/// List all recitations
pub async fn list_recitations(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Recitation>>> {
    Ok(Json(state.recitations().list_recitations()?))
}

/// Get a recitation by reciter and slug
pub async fn get_recitation(
    State(state): State<Arc<AppState>>,
    Path((reciter, slug)): Path<(String, String)>,
) -> ApiResult<Json<Recitation>> {
    state
        .recitations()
        .get_recitation(&reciter, &slug)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Recitation not found: {}/{}", reciter, slug)))
}

/// Rename one of the caller's recitations
pub async fn update_recitation(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(slug): Path<String>,
    Json(body): Json<UpdateRecitationBody>,
) -> ApiResult<Json<Recitation>> {
    let recitation = state.recitations().update_recitation_name(
        &identity.username,
        &slug,
        body.name.as_deref(),
    )?;
    Ok(Json(recitation))
}

/// Delete one of the caller's recitations with all of its files
pub async fn delete_recitation(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<Recitation>> {
    let recitation = state
        .recitations()
        .delete_recitation(&identity.username, &slug)?;

    if let Err(e) = state
        .artifacts()
        .remove_recitation(&identity.username, &slug)
        .await
    {
        warn!(reciter = %identity.username, slug = %slug, error = %e, "Failed to remove recitation directory");
    }

    info!(reciter = %recitation.reciter, slug = %recitation.slug, "Recitation deleted");
    Ok(Json(recitation))
}
