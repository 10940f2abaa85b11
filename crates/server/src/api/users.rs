//! User API handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tilawah_core::User;
use tracing::{info, warn};

use super::error::{ApiError, ApiResult};
use super::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub displayname: Option<String>,
}

/// List all users
pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.accounts().list_users()?))
}

/// Get a user by username
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> ApiResult<Json<User>> {
    state
        .accounts()
        .get_user(&username)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("User not found: {}", username)))
}

/// Update the caller's displayname
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Json(body): Json<UpdateUserBody>,
) -> ApiResult<Json<User>> {
    let user = state
        .accounts()
        .update_displayname(&identity.username, body.displayname.as_deref())?;
    Ok(Json(user))
}

/// Delete the caller's account with everything they uploaded
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<User>> {
    let user = state
        .accounts()
        .get_user(&identity.username)?
        .ok_or_else(|| ApiError::not_found(format!("User not found: {}", identity.username)))?;

    state.accounts().delete_user(&identity.username)?;

    if let Err(e) = state.artifacts().remove_reciter(&identity.username).await {
        warn!(username = %identity.username, error = %e, "Failed to remove upload directory");
    }

    info!(username = %identity.username, "User deleted");
    Ok(Json(user))
}
