//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock transcoder and aligner injected, so the upload and lafzize flows
//! run without ffmpeg or an alignment service.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use tilawah_core::testing::{MockAligner, MockTranscoder};
use tilawah_core::{
    AccountStore, Aligner, Config, Database, FailurePolicy, RecitationStore, SqliteAccountStore,
    SqliteRecitationStore, Transcoder,
};
use tilawah_server::state::AppState;

/// Re-export fixtures for test convenience
pub use tilawah_core::testing::fixtures;

const BOUNDARY: &str = "tilawah-test-boundary";

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_create_recitation() {
///     let fixture = TestFixture::new().await;
///     let alice = fixture.login_new("alice").await;
///
///     let response = fixture
///         .post_as(&alice, "/api/v1/recitations", json!({ "slug": "hafs" }))
///         .await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub state: Arc<AppState>,
    /// Mock aligner - configure alignment answers, hold jobs mid-flight
    pub aligner: Arc<MockAligner>,
    /// Mock transcoder - copies uploads unchanged or fails on demand
    pub transcoder: Arc<MockTranscoder>,
    /// Temporary directory for the test database and uploads
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Cookies of a logged in user.
#[derive(Debug, Clone)]
pub struct Login {
    pub username: String,
    pub session_token: String,
    pub csrf_token: String,
}

enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Vec<u8>),
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.database.path = temp_dir.path().join("test.db");
        config.storage.data_dir = temp_dir.path().join("data");
        config.lafzize.on_failure = test_config.on_failure;
        if let Some(max) = test_config.max_upload_bytes {
            config.storage.max_upload_bytes = max;
        }

        let db = Arc::new(Database::open(&config.database.path).expect("Failed to open database"));
        let accounts: Arc<dyn AccountStore> = Arc::new(SqliteAccountStore::new(Arc::clone(&db)));
        let recitations: Arc<dyn RecitationStore> = Arc::new(SqliteRecitationStore::new(db));

        let aligner = Arc::new(MockAligner::new());
        let transcoder = Arc::new(MockTranscoder::new());

        let state = Arc::new(AppState::new(
            config,
            accounts,
            recitations,
            Arc::clone(&transcoder) as Arc<dyn Transcoder>,
            Arc::clone(&aligner) as Arc<dyn Aligner>,
        ));

        let router = tilawah_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            aligner,
            transcoder,
            temp_dir,
        }
    }

    /// Directory uploads are written to.
    pub fn uploads_dir(&self) -> PathBuf {
        self.state.config().storage.uploads_dir()
    }

    /// Register `username` (password "password") and log in.
    pub async fn login_new(&self, username: &str) -> Login {
        let response = self
            .post(
                "/api/v1/register",
                json!({ "username": username, "password": "password" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "register: {}", response.body);
        self.login(username, "password").await
    }

    /// Log in and pick the two cookies out of the response.
    pub async fn login(&self, username: &str, password: &str) -> Login {
        let response = self
            .post(
                "/api/v1/login",
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login: {}", response.body);

        Login {
            username: username.to_string(),
            session_token: response
                .cookie("session_token")
                .expect("login sets session_token"),
            csrf_token: response.cookie("csrf_token").expect("login sets csrf_token"),
        }
    }

    /// Create a recitation owned by `login`.
    pub async fn create_recitation(&self, login: &Login, slug: &str) -> TestResponse {
        self.post_as(login, "/api/v1/recitations", json!({ "slug": slug }))
            .await
    }

    /// Upload `audio` as the file for `verse_key`.
    pub async fn upload(
        &self,
        login: &Login,
        slug: &str,
        verse_key: &str,
        audio: &[u8],
    ) -> TestResponse {
        let body = multipart_body(&[
            ("verse_key", None, verse_key.as_bytes()),
            ("file", Some("audio.wav"), audio),
        ]);
        self.upload_raw(login, slug, body).await
    }

    /// Send an already encoded multipart body to the upload route.
    pub async fn upload_raw(&self, login: &Login, slug: &str, body: Vec<u8>) -> TestResponse {
        self.request(
            "POST",
            &format!("/api/v1/recitation-files/{}", slug),
            RequestBody::Multipart(body),
            Some(login),
        )
        .await
    }

    /// Poll a file until no lafzize job holds it.
    pub async fn wait_until_idle(&self, reciter: &str, slug: &str, verse_key: &str) -> Value {
        let path = format!("/api/v1/recitation-files/{}/{}/{}", reciter, slug, verse_key);
        for _ in 0..200 {
            let response = self.get(&path).await;
            if response.status == StatusCode::OK && response.body["lafzize_processing"] == false {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} stayed in processing", path);
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, RequestBody::Empty, None).await
    }

    /// Send an anonymous POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, RequestBody::Json(body), None)
            .await
    }

    pub async fn post_as(&self, login: &Login, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, RequestBody::Json(body), Some(login))
            .await
    }

    pub async fn post_empty_as(&self, login: &Login, path: &str) -> TestResponse {
        self.request("POST", path, RequestBody::Empty, Some(login))
            .await
    }

    pub async fn put_as(&self, login: &Login, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, RequestBody::Json(body), Some(login))
            .await
    }

    pub async fn delete_as(&self, login: &Login, path: &str) -> TestResponse {
        self.request("DELETE", path, RequestBody::Empty, Some(login))
            .await
    }

    /// Send a DELETE request without credentials.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, RequestBody::Empty, None).await
    }

    /// Fetch a path and return the raw body (for static files and metrics).
    pub async fn get_raw(&self, path: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, bytes.to_vec())
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: RequestBody,
        login: Option<&Login>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(login) = login {
            request_builder = request_builder
                .header(
                    header::COOKIE,
                    format!(
                        "session_token={}; csrf_token={}",
                        login.session_token, login.csrf_token
                    ),
                )
                .header("X-CSRF-TOKEN", &login.csrf_token);
        }

        let body = match body {
            RequestBody::Empty => Body::empty(),
            RequestBody::Json(json_body) => {
                request_builder = request_builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&json_body).unwrap())
            }
            RequestBody::Multipart(bytes) => {
                request_builder = request_builder.header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                );
                Body::from(bytes)
            }
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

impl TestResponse {
    /// Value of a cookie set by this response.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| {
                let pair = value.split(';').next()?;
                let (key, value) = pair.split_once('=')?;
                (key == name).then(|| value.to_string())
            })
    }
}

/// Encode `(name, filename, data)` parts as multipart/form-data.
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    pub on_failure: FailurePolicy,
    pub max_upload_bytes: Option<usize>,
}

impl TestConfig {
    /// Failed jobs release the file instead of keeping it locked.
    pub fn releasing_failures() -> Self {
        Self {
            on_failure: FailurePolicy::Release,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
