//! Shared SQLite connection.
//!
//! Accounts, recitations and recitation files live in one database so that
//! foreign keys can cascade deletes from a user down to their files. Each
//! store holds an `Arc<Database>` and takes the connection lock per call.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Database error: {0}")]
pub struct DatabaseError(pub String);

impl From<rusqlite::Error> for DatabaseError {
    fn from(e: rusqlite::Error) -> Self {
        DatabaseError(e.to_string())
    }
}

/// True for UNIQUE/PRIMARY KEY/FOREIGN KEY violations.
pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and make sure all tables exist.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn
            .lock()
            .map_err(|_| DatabaseError("connection lock poisoned".to_string()))
    }

    fn initialize_schema(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                displayname TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                session_token TEXT PRIMARY KEY,
                csrf_token TEXT NOT NULL,
                username TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
                expires_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_username ON sessions(username);

            CREATE TABLE IF NOT EXISTS recitations (
                reciter TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
                slug TEXT NOT NULL,
                name TEXT NOT NULL,
                PRIMARY KEY (reciter, slug)
            );

            CREATE TABLE IF NOT EXISTS recitation_files (
                reciter TEXT NOT NULL,
                slug TEXT NOT NULL,
                verse_key TEXT NOT NULL,
                has_timings INTEGER NOT NULL DEFAULT 0,
                lafzize_processing INTEGER NOT NULL DEFAULT 0,
                lafzize_claim TEXT,
                PRIMARY KEY (reciter, slug, verse_key),
                FOREIGN KEY (reciter, slug) REFERENCES recitations(reciter, slug) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_recitation_files_processing
                ON recitation_files(lafzize_processing);
            "#,
        )?;
        Ok(())
    }
}
