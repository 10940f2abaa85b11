//! Testing utilities and mock implementations.
//!
//! Mocks for the two external processes the server depends on (the
//! alignment service and ffmpeg), so the whole upload and lafzize flow can be
//! exercised without either installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use tilawah_core::testing::{MockAligner, MockTranscoder};
//!
//! let aligner = MockAligner::new();
//! let transcoder = MockTranscoder::new();
//!
//! aligner.set_payload(br#"{"segments":[{"start":0.0,"end":1.2}]}"#.to_vec()).await;
//! transcoder.set_failure(Some("unsupported codec")).await;
//! ```

mod mock_aligner;
mod mock_transcoder;

pub use mock_aligner::{MockAligner, MockAlignment, RecordedAlignment};
pub use mock_transcoder::MockTranscoder;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::recitation::{Segment, Timing};

    /// A two-word timing document.
    pub fn timing() -> Timing {
        Timing {
            text: Some("bismi allahi".to_string()),
            segments: vec![
                Segment {
                    start: 0.0,
                    end: 0.64,
                    text: Some("bismi".to_string()),
                    score: Some(0.97),
                },
                Segment {
                    start: 0.64,
                    end: 1.5,
                    text: Some("allahi".to_string()),
                    score: Some(0.91),
                },
            ],
        }
    }

    /// The same document as the alignment service would send it.
    pub fn timing_payload() -> Vec<u8> {
        serde_json::to_vec(&timing()).unwrap_or_default()
    }
}
