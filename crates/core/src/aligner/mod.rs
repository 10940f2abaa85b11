//! Word-level alignment of recitation audio.

mod error;
mod lafzize_client;
mod traits;

pub use error::AlignerError;
pub use lafzize_client::LafzizeClient;
pub use traits::{Aligner, AlignmentStream};
