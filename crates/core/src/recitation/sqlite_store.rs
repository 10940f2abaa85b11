//! SQLite-backed recitation store.

use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{
    validate_slug, validate_verse_key, Claim, FileKey, Recitation, RecitationError,
    RecitationFile, RecitationStore,
};
use crate::db::{is_constraint_violation, Database};

const FILE_COLUMNS: &str = "reciter, slug, verse_key, has_timings, lafzize_processing";

pub struct SqliteRecitationStore {
    db: Arc<Database>,
}

impl SqliteRecitationStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn row_to_recitation(row: &rusqlite::Row) -> rusqlite::Result<Recitation> {
        Ok(Recitation {
            reciter: row.get(0)?,
            slug: row.get(1)?,
            name: row.get(2)?,
        })
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<RecitationFile> {
        Ok(RecitationFile {
            reciter: row.get(0)?,
            slug: row.get(1)?,
            verse_key: row.get(2)?,
            has_timings: row.get(3)?,
            lafzize_processing: row.get(4)?,
        })
    }

    fn select_recitation(
        conn: &Connection,
        reciter: &str,
        slug: &str,
    ) -> Result<Option<Recitation>, RecitationError> {
        conn.query_row(
            "SELECT reciter, slug, name FROM recitations WHERE reciter = ? AND slug = ?",
            params![reciter, slug],
            Self::row_to_recitation,
        )
        .optional()
        .map_err(|e| RecitationError::Database(e.to_string()))
    }

    fn select_file(
        conn: &Connection,
        key: &FileKey,
    ) -> Result<Option<RecitationFile>, RecitationError> {
        conn.query_row(
            &format!(
                "SELECT {} FROM recitation_files WHERE reciter = ? AND slug = ? AND verse_key = ?",
                FILE_COLUMNS
            ),
            params![key.reciter, key.slug, key.verse_key],
            Self::row_to_file,
        )
        .optional()
        .map_err(|e| RecitationError::Database(e.to_string()))
    }

    fn recitation_label(reciter: &str, slug: &str) -> String {
        format!("{}/{}", reciter, slug)
    }
}

impl RecitationStore for SqliteRecitationStore {
    fn create_recitation(
        &self,
        reciter: &str,
        slug: &str,
        name: Option<&str>,
    ) -> Result<Recitation, RecitationError> {
        validate_slug(slug)?;
        let name = name.filter(|n| !n.is_empty()).unwrap_or(slug);

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO recitations (reciter, slug, name) VALUES (?, ?, ?)",
            params![reciter, slug, name],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                RecitationError::AlreadyExists(Self::recitation_label(reciter, slug))
            } else {
                RecitationError::Database(e.to_string())
            }
        })?;

        Ok(Recitation {
            reciter: reciter.to_string(),
            slug: slug.to_string(),
            name: name.to_string(),
        })
    }

    fn get_recitation(
        &self,
        reciter: &str,
        slug: &str,
    ) -> Result<Option<Recitation>, RecitationError> {
        let conn = self.db.lock()?;
        Self::select_recitation(&conn, reciter, slug)
    }

    fn list_recitations(&self) -> Result<Vec<Recitation>, RecitationError> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare("SELECT reciter, slug, name FROM recitations ORDER BY reciter ASC, slug ASC")
            .map_err(|e| RecitationError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_recitation)
            .map_err(|e| RecitationError::Database(e.to_string()))?;

        let mut recitations = Vec::new();
        for row_result in rows {
            recitations.push(row_result.map_err(|e| RecitationError::Database(e.to_string()))?);
        }
        Ok(recitations)
    }

    fn update_recitation_name(
        &self,
        reciter: &str,
        slug: &str,
        name: Option<&str>,
    ) -> Result<Recitation, RecitationError> {
        let conn = self.db.lock()?;

        if let Some(name) = name.filter(|n| !n.is_empty()) {
            conn.execute(
                "UPDATE recitations SET name = ? WHERE reciter = ? AND slug = ?",
                params![name, reciter, slug],
            )
            .map_err(|e| RecitationError::Database(e.to_string()))?;
        }

        Self::select_recitation(&conn, reciter, slug)?
            .ok_or_else(|| RecitationError::NotFound(Self::recitation_label(reciter, slug)))
    }

    fn delete_recitation(&self, reciter: &str, slug: &str) -> Result<Recitation, RecitationError> {
        let conn = self.db.lock()?;
        conn.query_row(
            "DELETE FROM recitations WHERE reciter = ? AND slug = ? RETURNING reciter, slug, name",
            params![reciter, slug],
            Self::row_to_recitation,
        )
        .optional()
        .map_err(|e| RecitationError::Database(e.to_string()))?
        .ok_or_else(|| RecitationError::NotFound(Self::recitation_label(reciter, slug)))
    }

    fn create_file(&self, key: &FileKey) -> Result<RecitationFile, RecitationError> {
        validate_verse_key(&key.verse_key)?;

        let conn = self.db.lock()?;
        if Self::select_recitation(&conn, &key.reciter, &key.slug)?.is_none() {
            return Err(RecitationError::NotFound(Self::recitation_label(
                &key.reciter,
                &key.slug,
            )));
        }

        conn.execute(
            "INSERT INTO recitation_files (reciter, slug, verse_key, has_timings, lafzize_processing) VALUES (?, ?, ?, 0, 0)",
            params![key.reciter, key.slug, key.verse_key],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                RecitationError::AlreadyExists(key.to_string())
            } else {
                RecitationError::Database(e.to_string())
            }
        })?;

        Ok(RecitationFile {
            reciter: key.reciter.clone(),
            slug: key.slug.clone(),
            verse_key: key.verse_key.clone(),
            has_timings: false,
            lafzize_processing: false,
        })
    }

    fn get_file(&self, key: &FileKey) -> Result<Option<RecitationFile>, RecitationError> {
        let conn = self.db.lock()?;
        Self::select_file(&conn, key)
    }

    fn list_files(
        &self,
        reciter: &str,
        slug: &str,
    ) -> Result<Vec<RecitationFile>, RecitationError> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM recitation_files WHERE reciter = ? AND slug = ? ORDER BY verse_key ASC",
                FILE_COLUMNS
            ))
            .map_err(|e| RecitationError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![reciter, slug], Self::row_to_file)
            .map_err(|e| RecitationError::Database(e.to_string()))?;

        let mut files = Vec::new();
        for row_result in rows {
            files.push(row_result.map_err(|e| RecitationError::Database(e.to_string()))?);
        }
        Ok(files)
    }

    fn delete_file(&self, key: &FileKey) -> Result<RecitationFile, RecitationError> {
        let conn = self.db.lock()?;
        conn.query_row(
            &format!(
                "DELETE FROM recitation_files WHERE reciter = ? AND slug = ? AND verse_key = ? RETURNING {}",
                FILE_COLUMNS
            ),
            params![key.reciter, key.slug, key.verse_key],
            Self::row_to_file,
        )
        .optional()
        .map_err(|e| RecitationError::Database(e.to_string()))?
        .ok_or_else(|| RecitationError::FileNotFound(key.clone()))
    }

    fn begin_processing(&self, key: &FileKey) -> Result<Claim, RecitationError> {
        let token = Uuid::new_v4().simple().to_string();
        let conn = self.db.lock()?;
        let claimed = conn
            .query_row(
                &format!(
                    "UPDATE recitation_files \
                     SET lafzize_processing = 1, has_timings = 0, lafzize_claim = ? \
                     WHERE reciter = ? AND slug = ? AND verse_key = ? AND lafzize_processing = 0 \
                     RETURNING {}",
                    FILE_COLUMNS
                ),
                params![token, key.reciter, key.slug, key.verse_key],
                Self::row_to_file,
            )
            .optional()
            .map_err(|e| RecitationError::Database(e.to_string()))?;

        match claimed {
            Some(file) => Ok(Claim { file, token }),
            None => match Self::select_file(&conn, key)? {
                Some(_) => Err(RecitationError::InProgress(key.clone())),
                None => Err(RecitationError::FileNotFound(key.clone())),
            },
        }
    }

    fn finish_processing(
        &self,
        key: &FileKey,
        claim_token: &str,
        has_timings: bool,
    ) -> Result<RecitationFile, RecitationError> {
        let conn = self.db.lock()?;
        let released = conn
            .query_row(
                &format!(
                    "UPDATE recitation_files \
                     SET lafzize_processing = 0, has_timings = ?, lafzize_claim = NULL \
                     WHERE reciter = ? AND slug = ? AND verse_key = ? \
                     AND lafzize_processing = 1 AND lafzize_claim = ? \
                     RETURNING {}",
                    FILE_COLUMNS
                ),
                params![has_timings, key.reciter, key.slug, key.verse_key, claim_token],
                Self::row_to_file,
            )
            .optional()
            .map_err(|e| RecitationError::Database(e.to_string()))?;

        match released {
            Some(file) => Ok(file),
            None => match Self::select_file(&conn, key)? {
                Some(_) => Err(RecitationError::NotClaimed(key.clone())),
                None => Err(RecitationError::FileNotFound(key.clone())),
            },
        }
    }

    fn check_claim(&self, key: &FileKey, claim_token: &str) -> Result<(), RecitationError> {
        let conn = self.db.lock()?;
        let held = conn
            .query_row(
                "SELECT 1 FROM recitation_files \
                 WHERE reciter = ? AND slug = ? AND verse_key = ? \
                 AND lafzize_processing = 1 AND lafzize_claim = ?",
                params![key.reciter, key.slug, key.verse_key, claim_token],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| RecitationError::Database(e.to_string()))?;

        match held {
            Some(()) => Ok(()),
            None => match Self::select_file(&conn, key)? {
                Some(_) => Err(RecitationError::NotClaimed(key.clone())),
                None => Err(RecitationError::FileNotFound(key.clone())),
            },
        }
    }

    fn reset_processing(&self) -> Result<Vec<FileKey>, RecitationError> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(
                "UPDATE recitation_files \
                 SET lafzize_processing = 0, has_timings = 0, lafzize_claim = NULL \
                 WHERE lafzize_processing = 1 RETURNING reciter, slug, verse_key",
            )
            .map_err(|e| RecitationError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(FileKey {
                    reciter: row.get(0)?,
                    slug: row.get(1)?,
                    verse_key: row.get(2)?,
                })
            })
            .map_err(|e| RecitationError::Database(e.to_string()))?;

        let mut keys = Vec::new();
        for row_result in rows {
            keys.push(row_result.map_err(|e| RecitationError::Database(e.to_string()))?);
        }
        Ok(keys)
    }
}
