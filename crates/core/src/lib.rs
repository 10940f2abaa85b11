pub mod account;
pub mod aligner;
pub mod artifact;
pub mod auth;
pub mod config;
pub mod db;
pub mod lafzize;
pub mod metrics;
pub mod recitation;
pub mod testing;
pub mod transcoder;
pub mod upload;

pub use account::{AccountError, AccountStore, Session, SqliteAccountStore, User};
pub use aligner::{Aligner, AlignerError, LafzizeClient};
pub use artifact::{ArtifactError, FsArtifactStore};
pub use auth::{create_authenticator, AuthError, AuthRequest, Authenticator, Identity};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, FailurePolicy,
    SanitizedConfig,
};
pub use db::{Database, DatabaseError};
pub use lafzize::{JobOutcome, JobStage, LafzizeCoordinator, LafzizeError, Submission};
pub use recitation::{
    FileKey, Recitation, RecitationError, RecitationFile, RecitationStore, SqliteRecitationStore,
    Timing,
};
pub use transcoder::{FfmpegTranscoder, TranscodeError, Transcoder};
pub use upload::{UploadError, UploadService};
