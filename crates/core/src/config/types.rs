use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub lafzize: LafzizeConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/db.sqlite")
}

/// Where uploaded audio and timing files live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root data directory. Uploads are kept under `<data_dir>/uploads`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Maximum accepted size of an uploaded audio file in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl StorageConfig {
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_max_upload_bytes() -> usize {
    4 << 20
}

/// Session authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Skip the `X-CSRF-TOKEN` header check on authenticated routes.
    #[serde(default)]
    pub disable_csrf_checks: bool,
    /// Lifetime of a login session in hours.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            disable_csrf_checks: false,
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

fn default_session_ttl_hours() -> u32 {
    24
}

/// What happens to a recitation file when its lafzize job fails.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave `lafzize_processing` set. The file stays locked until it is
    /// deleted or recovered at startup.
    #[default]
    KeepInProgress,
    /// Clear both flags and remove any partial timings so the owner can retry.
    Release,
}

/// Lafzize (alignment service) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LafzizeConfig {
    /// URL the audio is POSTed to.
    #[serde(default = "default_lafzize_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    /// Reset files left in processing by a previous run before serving.
    #[serde(default)]
    pub recover_on_startup: bool,
}

impl Default for LafzizeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_lafzize_endpoint(),
            on_failure: FailurePolicy::default(),
            recover_on_startup: false,
        }
    }
}

fn default_lafzize_endpoint() -> String {
    "http://localhost:3001".to_string()
}

/// Upload transcoder configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscoderConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub max_upload_bytes: usize,
    pub csrf_checks: bool,
    pub session_ttl_hours: u32,
    pub lafzize: SanitizedLafzizeConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLafzizeConfig {
    pub endpoint_configured: bool,
    pub on_failure: FailurePolicy,
    pub recover_on_startup: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            max_upload_bytes: config.storage.max_upload_bytes,
            csrf_checks: !config.auth.disable_csrf_checks,
            session_ttl_hours: config.auth.session_ttl_hours,
            lafzize: SanitizedLafzizeConfig {
                endpoint_configured: !config.lafzize.endpoint.is_empty(),
                on_failure: config.lafzize.on_failure,
                recover_on_startup: config.lafzize.recover_on_startup,
            },
        }
    }
}
