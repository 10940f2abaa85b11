//! Registration, login and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tilawah_core::auth::{CSRF_COOKIE, SESSION_COOKIE};
use tilawah_core::User;
use tracing::info;

use super::error::ApiResult;
use super::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub username: String,
}

fn session_cookie(token: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Lax",
        SESSION_COOKIE, token, max_age
    )
}

/// Readable by scripts so the frontend can echo it in `X-CSRF-TOKEN`.
fn csrf_cookie(token: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; Secure; SameSite=Lax",
        CSRF_COOKIE, token, max_age
    )
}

fn request_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

/// Create an account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsBody>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.accounts().register(&body.username, &body.password)?;
    info!(username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Check credentials and start a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsBody>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .accounts()
        .verify_credentials(&body.username, &body.password)?;

    let ttl_hours = i64::from(state.config().auth.session_ttl_hours);
    let session = state
        .accounts()
        .create_session(&user.username, chrono::Duration::hours(ttl_hours))?;
    let max_age = ttl_hours * 3600;

    info!(username = %user.username, "User logged in");
    Ok((
        AppendHeaders([
            (
                header::SET_COOKIE,
                session_cookie(&session.session_token, max_age),
            ),
            (header::SET_COOKIE, csrf_cookie(&session.csrf_token, max_age)),
        ]),
        Json(user),
    ))
}

/// End the session named by the request's session cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = request_cookie(&headers, SESSION_COOKIE) {
        state.accounts().delete_session(token)?;
    }

    info!(username = %identity.username, "User logged out");
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, session_cookie("", 0)),
            (header::SET_COOKIE, csrf_cookie("", 0)),
        ]),
        Json(LogoutResponse {
            username: identity.username,
        }),
    ))
}
