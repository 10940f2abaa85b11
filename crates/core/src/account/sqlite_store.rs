//! SQLite-backed account store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use super::{validate_password, validate_username, AccountError, AccountStore, Session, User};
use crate::db::{is_constraint_violation, Database};

pub struct SqliteAccountStore {
    db: Arc<Database>,
}

impl SqliteAccountStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            username: row.get(0)?,
            displayname: row.get(1)?,
        })
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        let expires_at_str: String = row.get(3)?;
        // An unparseable timestamp is treated as already expired.
        let expires_at = DateTime::parse_from_rfc3339(&expires_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        Ok(Session {
            session_token: row.get(0)?,
            csrf_token: row.get(1)?,
            username: row.get(2)?,
            expires_at,
        })
    }

    fn new_token() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }
}

impl AccountStore for SqliteAccountStore {
    fn register(&self, username: &str, password: &str) -> Result<User, AccountError> {
        validate_username(username)?;
        validate_password(password)?;

        let password_hash =
            hash_password(password).map_err(|e| AccountError::Hashing(e.to_string()))?;

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO users (username, password_hash, displayname) VALUES (?, ?, ?)",
            params![username, password_hash, username],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                AccountError::AlreadyExists(username.to_string())
            } else {
                AccountError::Database(e.to_string())
            }
        })?;

        Ok(User {
            username: username.to_string(),
            displayname: username.to_string(),
        })
    }

    fn verify_credentials(&self, username: &str, password: &str) -> Result<User, AccountError> {
        let row = {
            let conn = self.db.lock()?;
            conn.query_row(
                "SELECT username, displayname, password_hash FROM users WHERE username = ?",
                params![username],
                |row| Ok((Self::row_to_user(row)?, row.get::<_, String>(2)?)),
            )
            .optional()
            .map_err(|e| AccountError::Database(e.to_string()))?
        };

        let (user, password_hash) = row.ok_or(AccountError::InvalidCredentials)?;
        let matches = verify_password(password, &password_hash)
            .map_err(|e| AccountError::Hashing(e.to_string()))?;
        if !matches {
            return Err(AccountError::InvalidCredentials);
        }
        Ok(user)
    }

    fn create_session(&self, username: &str, ttl: Duration) -> Result<Session, AccountError> {
        let session = Session {
            session_token: Self::new_token(),
            csrf_token: Self::new_token(),
            username: username.to_string(),
            expires_at: Utc::now() + ttl,
        };

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO sessions (session_token, csrf_token, username, expires_at) VALUES (?, ?, ?, ?)",
            params![
                session.session_token,
                session.csrf_token,
                session.username,
                session.expires_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                AccountError::NotFound(username.to_string())
            } else {
                AccountError::Database(e.to_string())
            }
        })?;

        Ok(session)
    }

    fn get_session(&self, session_token: &str) -> Result<Option<Session>, AccountError> {
        let conn = self.db.lock()?;
        let session = conn
            .query_row(
                "SELECT session_token, csrf_token, username, expires_at FROM sessions WHERE session_token = ?",
                params![session_token],
                Self::row_to_session,
            )
            .optional()
            .map_err(|e| AccountError::Database(e.to_string()))?;

        match session {
            Some(session) if session.is_expired() => {
                conn.execute(
                    "DELETE FROM sessions WHERE session_token = ?",
                    params![session_token],
                )
                .map_err(|e| AccountError::Database(e.to_string()))?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn delete_session(&self, session_token: &str) -> Result<(), AccountError> {
        let conn = self.db.lock()?;
        conn.execute(
            "DELETE FROM sessions WHERE session_token = ?",
            params![session_token],
        )
        .map_err(|e| AccountError::Database(e.to_string()))?;
        Ok(())
    }

    fn get_user(&self, username: &str) -> Result<Option<User>, AccountError> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT username, displayname FROM users WHERE username = ?",
            params![username],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AccountError::Database(e.to_string()))
    }

    fn list_users(&self) -> Result<Vec<User>, AccountError> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare("SELECT username, displayname FROM users ORDER BY username ASC")
            .map_err(|e| AccountError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_user)
            .map_err(|e| AccountError::Database(e.to_string()))?;

        let mut users = Vec::new();
        for row_result in rows {
            users.push(row_result.map_err(|e| AccountError::Database(e.to_string()))?);
        }
        Ok(users)
    }

    fn update_displayname(
        &self,
        username: &str,
        displayname: Option<&str>,
    ) -> Result<User, AccountError> {
        let conn = self.db.lock()?;

        if let Some(displayname) = displayname.filter(|d| !d.is_empty()) {
            conn.execute(
                "UPDATE users SET displayname = ? WHERE username = ?",
                params![displayname, username],
            )
            .map_err(|e| AccountError::Database(e.to_string()))?;
        }

        conn.query_row(
            "SELECT username, displayname FROM users WHERE username = ?",
            params![username],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AccountError::Database(e.to_string()))?
        .ok_or_else(|| AccountError::NotFound(username.to_string()))
    }

    fn delete_user(&self, username: &str) -> Result<(), AccountError> {
        let conn = self.db.lock()?;
        let deleted = conn
            .execute("DELETE FROM users WHERE username = ?", params![username])
            .map_err(|e| AccountError::Database(e.to_string()))?;

        if deleted == 0 {
            return Err(AccountError::NotFound(username.to_string()));
        }
        Ok(())
    }
}
