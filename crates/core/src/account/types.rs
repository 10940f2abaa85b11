use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::AccountError;

pub const MIN_CREDENTIAL_LEN: usize = 3;
pub const MAX_CREDENTIAL_LEN: usize = 64;

/// Usernames double as upload directory names.
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub displayname: String,
}

/// A login session. The session token is the cookie value, the CSRF token
/// must be echoed back in the `X-CSRF-TOKEN` header.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_token: String,
    pub csrf_token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

pub fn validate_username(username: &str) -> Result<(), AccountError> {
    let len = username.chars().count();
    if !(MIN_CREDENTIAL_LEN..=MAX_CREDENTIAL_LEN).contains(&len) {
        return Err(AccountError::Invalid(format!(
            "username must be between {} and {} characters",
            MIN_CREDENTIAL_LEN, MAX_CREDENTIAL_LEN
        )));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(AccountError::Invalid(
            "username may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AccountError> {
    let len = password.chars().count();
    if !(MIN_CREDENTIAL_LEN..=MAX_CREDENTIAL_LEN).contains(&len) {
        return Err(AccountError::Invalid(format!(
            "password must be between {} and {} characters",
            MIN_CREDENTIAL_LEN, MAX_CREDENTIAL_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("abd_ul-basit").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
        assert!(validate_username(&"a".repeat(64)).is_ok());
        assert!(validate_username("../etc").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("abc").is_ok());
        assert!(validate_password("ab").is_err());
        assert!(validate_password(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_session_expiry() {
        let mut session = Session {
            session_token: "s".to_string(),
            csrf_token: "c".to_string(),
            username: "alice".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(!session.is_expired());

        session.expires_at = Utc::now() - Duration::seconds(1);
        assert!(session.is_expired());
    }
}
