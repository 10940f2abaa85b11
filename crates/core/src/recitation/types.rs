use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::RecitationError;

/// Slugs become directory names under the reciter's upload directory.
static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,63}$").unwrap());

/// Verse keys (`chapter:verse`) become file names.
static VERSE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,3}:[0-9]{1,3}$").unwrap());

/// Identity of one recitation file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileKey {
    pub reciter: String,
    pub slug: String,
    pub verse_key: String,
}

impl FileKey {
    pub fn new(
        reciter: impl Into<String>,
        slug: impl Into<String>,
        verse_key: impl Into<String>,
    ) -> Self {
        Self {
            reciter: reciter.into(),
            slug: slug.into(),
            verse_key: verse_key.into(),
        }
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.reciter, self.slug, self.verse_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recitation {
    pub reciter: String,
    pub slug: String,
    pub name: String,
}

/// Persisted record for one uploaded verse.
///
/// `lafzize_processing` set means a job owns the file and any timings on disk
/// are stale. `has_timings` is only trustworthy while `lafzize_processing` is
/// clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecitationFile {
    pub reciter: String,
    pub slug: String,
    pub verse_key: String,
    pub has_timings: bool,
    pub lafzize_processing: bool,
}

impl RecitationFile {
    pub fn key(&self) -> FileKey {
        FileKey::new(&self.reciter, &self.slug, &self.verse_key)
    }
}

/// Proof of ownership of a file's processing flag, handed out by
/// `begin_processing`. Only the holder can release the flag again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub file: RecitationFile,
    pub token: String,
}

/// Word-level alignment of a recitation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

pub fn validate_slug(slug: &str) -> Result<(), RecitationError> {
    if !SLUG_RE.is_match(slug) {
        return Err(RecitationError::Invalid(format!(
            "slug '{}' must be lowercase letters, digits and '-' (max 64)",
            slug
        )));
    }
    Ok(())
}

pub fn validate_verse_key(verse_key: &str) -> Result<(), RecitationError> {
    if !VERSE_KEY_RE.is_match(verse_key) {
        return Err(RecitationError::Invalid(format!(
            "verse key '{}' must look like 'chapter:verse'",
            verse_key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key_display() {
        let key = FileKey::new("alice", "hafs", "1:1");
        assert_eq!(key.to_string(), "alice/hafs/1:1");
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("hafs").is_ok());
        assert!(validate_slug("murattal-2024").is_ok());
        assert!(validate_slug("-leading-dash").is_err());
        assert!(validate_slug("Upper").is_err());
        assert!(validate_slug("../up").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_slug(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_verse_key() {
        assert!(validate_verse_key("1:1").is_ok());
        assert!(validate_verse_key("114:6").is_ok());
        assert!(validate_verse_key("2:286").is_ok());
        assert!(validate_verse_key("1").is_err());
        assert!(validate_verse_key("1:1/../x").is_err());
        assert!(validate_verse_key("1000:1").is_err());
    }

    #[test]
    fn test_timing_optional_fields() {
        let json = r#"{"segments":[{"start":0.0,"end":0.42}]}"#;
        let timing: Timing = serde_json::from_str(json).unwrap();
        assert_eq!(timing.text, None);
        assert_eq!(timing.segments.len(), 1);
        assert_eq!(timing.segments[0].score, None);

        // Absent fields stay absent
        assert_eq!(serde_json::to_string(&timing).unwrap(), json);
    }

    #[test]
    fn test_timing_full() {
        let json = r#"{"text":"bismi","segments":[{"start":0.1,"end":0.5,"text":"bismi","score":0.93}]}"#;
        let timing: Timing = serde_json::from_str(json).unwrap();
        assert_eq!(timing.text.as_deref(), Some("bismi"));
        assert_eq!(timing.segments[0].text.as_deref(), Some("bismi"));
        assert_eq!(timing.segments[0].score, Some(0.93));
    }

    #[test]
    fn test_timing_requires_segments() {
        let result: Result<Timing, _> = serde_json::from_str(r#"{"text":"x"}"#);
        assert!(result.is_err());
    }
}
