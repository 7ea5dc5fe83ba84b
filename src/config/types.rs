use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder secret used when none is configured. `validate` warns about it.
pub const DEFAULT_SESSION_SECRET: &str = "cinestream-dev-secret-change-me";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub uploads: UploadsConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub recommender: RecommenderConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of static pages served as the fallback route
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// HTML page served by `GET /movie` once a movie is bound
    #[serde(default)]
    pub player_page: Option<PathBuf>,

    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address reported by `GET /api/admin-email`
    #[serde(default)]
    pub admin_email: Option<String>,

    /// Allowed CORS origin (any origin when unset)
    #[serde(default)]
    pub cors_origin: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_db_path() -> PathBuf {
    PathBuf::from("cinestream.db")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            player_page: None,
            db_path: default_db_path(),
            admin_email: None,
            cors_origin: None,
        }
    }
}

/// Which backend holds session state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStoreKind {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// HMAC key for signing session cookies (overridden by `SESSION_SECRET`)
    #[serde(default = "default_session_secret")]
    pub secret: String,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Session lifetime in hours (default: 24)
    #[serde(default = "default_session_timeout")]
    pub timeout_hours: u64,

    /// Mark the cookie `Secure` (HTTPS only)
    #[serde(default)]
    pub secure_cookie: bool,

    #[serde(default)]
    pub store: SessionStoreKind,

    /// Seconds between sweeps of expired sessions
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_session_secret() -> String {
    DEFAULT_SESSION_SECRET.to_string()
}
fn default_cookie_name() -> String {
    "cinestream.sid".to_string()
}
fn default_session_timeout() -> u64 {
    24
}
fn default_cleanup_interval() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: default_session_secret(),
            cookie_name: default_cookie_name(),
            timeout_hours: default_session_timeout(),
            secure_cookie: false,
            store: SessionStoreKind::default(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// How the `Range` header of `/video` is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    /// Only `bytes=<start>-[<end>]` is accepted; anything else is 416.
    #[default]
    Strict,
    /// Every non-digit is stripped and the rest is the start offset.
    Lenient,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// Maximum bytes served per range response
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    #[serde(default)]
    pub range_mode: RangeMode,

    /// Abort a response when a disk read stalls, or the client takes no
    /// chunk, for this many seconds
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
}

fn default_chunk_size() -> u64 {
    1_000_000
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            range_mode: RangeMode::default(),
            idle_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadsConfig {
    /// Root of the `movies/` and `posters/` asset directories
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,

    /// Request body limit for `POST /api/movies`
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}
fn default_max_upload_bytes() -> usize {
    1000 * 1024 * 1024
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Who may bind a movie into their session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicyKind {
    #[default]
    Open,
    SignedIn,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub policy: AccessPolicyKind,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommenderConfig {
    /// Endpoint receiving `POST {user_id}` after login; disabled when unset
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_recommender_timeout")]
    pub timeout_secs: u64,
}

fn default_recommender_timeout() -> u64 {
    5
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_recommender_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Login attempts accepted per minute across all clients
    #[serde(default = "default_login_per_minute")]
    pub login_per_minute: u32,
}

fn default_login_per_minute() -> u32 {
    30
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_per_minute: default_login_per_minute(),
        }
    }
}
