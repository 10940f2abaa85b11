//! Authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tilawah_core::{AuthError, AuthRequest, Identity};

use super::error::ApiError;
use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Authentication middleware that validates requests using the configured authenticator.
///
/// On success the caller's [`Identity`] is inserted into the request
/// extensions for [`AuthUser`] to pick up. Otherwise the request is answered
/// with 401 without reaching the handler.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract headers into HashMap for AuthRequest
    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    // Get source IP (default to localhost if not available)
    let source_ip = request
        .extensions()
        .get::<std::net::SocketAddr>()
        .map(|addr| addr.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));

    let auth_request = AuthRequest { headers, source_ip };

    match state.authenticator().authenticate(&auth_request).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(e) => {
            let reason = match e {
                AuthError::NotAuthenticated => "not_authenticated",
                AuthError::InvalidCredentials(_) => "invalid_credentials",
                AuthError::InvalidCsrfToken => "invalid_csrf_token",
                AuthError::ServiceUnavailable(_) => "internal_error",
            };
            AUTH_FAILURES_TOTAL.with_label_values(&[reason]).inc();
            Err(ApiError::from(e))
        }
    }
}

/// Extractor for the authenticated caller.
///
/// Reads the [`Identity`] stored by [`auth_middleware`]. A route that uses
/// it without the middleware rejects every request with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthorized(AuthError::NotAuthenticated.to_string()));
        std::future::ready(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use tilawah_core::testing::{MockAligner, MockTranscoder};
    use tilawah_core::{AccountStore, Config, Database, SqliteAccountStore, SqliteRecitationStore};
    use tower::ServiceExt;

    async fn whoami(AuthUser(identity): AuthUser) -> String {
        identity.username
    }

    fn create_test_state(disable_csrf_checks: bool) -> (Arc<AppState>, Arc<SqliteAccountStore>) {
        let db = Arc::new(Database::in_memory().unwrap());
        let accounts = Arc::new(SqliteAccountStore::new(Arc::clone(&db)));
        let recitations = Arc::new(SqliteRecitationStore::new(db));

        let mut config = Config::default();
        config.auth.disable_csrf_checks = disable_csrf_checks;

        let state = Arc::new(AppState::new(
            config,
            accounts.clone(),
            recitations,
            Arc::new(MockTranscoder::new()),
            Arc::new(MockAligner::new()),
        ));
        (state, accounts)
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/test", get(whoami))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    fn login(accounts: &SqliteAccountStore) -> tilawah_core::Session {
        accounts.register("alice", "secret").unwrap();
        accounts
            .create_session("alice", chrono::Duration::hours(1))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_session_reaches_handler() {
        let (state, accounts) = create_test_state(false);
        let session = login(&accounts);

        let request = Request::builder()
            .uri("/test")
            .header(
                header::COOKIE,
                format!("session_token={}", session.session_token),
            )
            .header("X-CSRF-TOKEN", &session.csrf_token)
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"alice");
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let (state, _accounts) = create_test_state(false);

        let request = Request::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_csrf_is_unauthorized() {
        let (state, accounts) = create_test_state(false);
        let session = login(&accounts);

        let request = Request::builder()
            .uri("/test")
            .header(
                header::COOKIE,
                format!("session_token={}", session.session_token),
            )
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_csrf_check_can_be_disabled() {
        let (state, accounts) = create_test_state(true);
        let session = login(&accounts);

        let request = Request::builder()
            .uri("/test")
            .header(
                header::COOKIE,
                format!("session_token={}", session.session_token),
            )
            .body(Body::empty())
            .unwrap();

        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_auth_user_without_middleware_rejects() {
        let (state, _accounts) = create_test_state(false);
        let app = Router::new().route("/test", get(whoami)).with_state(state);

        let request = Request::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
