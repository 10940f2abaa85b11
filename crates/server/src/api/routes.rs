use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::{auth, files, handlers, lafzize, recitations, timings, users};
use super::middleware::{auth_middleware, metrics_middleware};
use crate::state::AppState;

/// Room for multipart framing and the `verse_key` field on top of the audio.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let uploads_dir = state.config().storage.uploads_dir();
    let upload_limit = state.config().storage.max_upload_bytes + MULTIPART_OVERHEAD;

    let public_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Accounts
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/users", get(users::list_users))
        .route("/users/{username}", get(users::get_user))
        // Recitations
        .route("/recitations", get(recitations::list_recitations))
        .route("/recitations/{reciter}/{slug}", get(recitations::get_recitation))
        // Files. `{owner}/{name}` is `{reciter}/{slug}` here and
        // `{slug}/{verse_key}` for the DELETE below; both routers must spell
        // the path identically for the merge.
        .route("/recitation-files/{owner}/{name}", get(files::list_files))
        .route(
            "/recitation-files/{reciter}/{slug}/{verse_key}",
            get(files::get_file),
        );

    let protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/user", put(users::update_user).delete(users::delete_user))
        .route("/recitations", post(recitations::create_recitation))
        .route(
            "/recitations/{slug}",
            put(recitations::update_recitation).delete(recitations::delete_recitation),
        )
        .route(
            "/recitation-files/{slug}",
            post(files::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/recitation-files/{owner}/{name}", delete(files::delete_file))
        .route(
            "/recitation-timings/{slug}/{verse_key}",
            post(timings::replace_timing).delete(timings::delete_timing),
        )
        .route("/lafzize/{slug}/{verse_key}", post(lafzize::submit))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = public_routes.merge(protected_routes).with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
