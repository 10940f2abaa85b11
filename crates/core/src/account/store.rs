//! Account storage trait and error type.

use chrono::Duration;
use thiserror::Error;

use super::{Session, User};
use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Invalid(String),

    /// Unknown user or wrong password. Deliberately does not say which.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DatabaseError> for AccountError {
    fn from(e: DatabaseError) -> Self {
        AccountError::Database(e.0)
    }
}

/// Trait for account and session storage backends.
pub trait AccountStore: Send + Sync {
    /// Validate, hash and insert a new user. The displayname starts out as
    /// the username.
    fn register(&self, username: &str, password: &str) -> Result<User, AccountError>;

    /// Check a username/password pair.
    fn verify_credentials(&self, username: &str, password: &str) -> Result<User, AccountError>;

    /// Start a new session for an existing user.
    fn create_session(&self, username: &str, ttl: Duration) -> Result<Session, AccountError>;

    /// Look up a live session. Expired sessions are removed and reported as `None`.
    fn get_session(&self, session_token: &str) -> Result<Option<Session>, AccountError>;

    /// Remove a session. Removing an unknown session is not an error.
    fn delete_session(&self, session_token: &str) -> Result<(), AccountError>;

    fn get_user(&self, username: &str) -> Result<Option<User>, AccountError>;

    fn list_users(&self) -> Result<Vec<User>, AccountError>;

    /// Change a displayname. `None` or an empty string keeps the current one.
    fn update_displayname(
        &self,
        username: &str,
        displayname: Option<&str>,
    ) -> Result<User, AccountError>;

    /// Delete a user together with their sessions, recitations and files.
    fn delete_user(&self, username: &str) -> Result<(), AccountError>;
}
