//! On-disk audio and timing artifacts.

mod error;
mod fs_store;

pub use error::ArtifactError;
pub use fs_store::{FsArtifactStore, StagedUpload, TimingsWriter};
