use std::path::PathBuf;
use std::time::Duration;

use common::storage::object::ObjectStoreConfig;
use common::units::{deserialize_byte_size, deserialize_duration};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::reference::ReferenceStyle;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnv {
    #[default]
    Dev,
    Prod,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Required. There is no default port.
    pub port: u16,
    /// Public origin used to build `/f/...` and `/s/...` links.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub env: RuntimeEnv,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_base_url() -> String {
    "http://localhost".into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC key for API tokens. Required and non-empty.
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://depot.db?mode=rwc".into()
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    1
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Per-file limit in bytes. Accepts `100MB` style strings.
    #[serde(default = "default_max_size", deserialize_with = "deserialize_byte_size")]
    pub max_size: u64,
    /// Total bytes a single user may keep stored.
    #[serde(
        default = "default_user_quota",
        deserialize_with = "deserialize_byte_size"
    )]
    pub user_quota: u64,
    /// Lifetime of an upload. Accepts `24h`, `7d`, `1h30m`.
    #[serde(default = "default_expires_in", deserialize_with = "deserialize_duration")]
    pub expires_in: Duration,
    #[serde(default)]
    pub default_style: ReferenceStyle,
    /// Where request bodies are staged before storage. Defaults to the system temp dir.
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
}

fn default_max_size() -> u64 {
    100 * 1024 * 1024
}
fn default_user_quota() -> u64 {
    1024 * 1024 * 1024
}
fn default_expires_in() -> Duration {
    Duration::from_secs(24 * 3600)
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            user_quota: default_user_quota(),
            expires_in: default_expires_in(),
            default_style: ReferenceStyle::default(),
            spool_dir: None,
        }
    }
}

impl UploadConfig {
    pub fn spool_dir(&self) -> PathBuf {
        self.spool_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    Local,
    Object,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
    /// Deadline for every storage operation.
    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub object: Option<ObjectStoreConfig>,
}

fn default_local_path() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_storage_timeout() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            local_path: default_local_path(),
            timeout_secs: default_storage_timeout(),
            object: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GeoIpConfig {
    /// MaxMind city database. GeoIP enrichment is disabled when unset.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    /// Blobs younger than this are never treated as orphans.
    #[serde(default = "default_reconcile_grace")]
    pub reconcile_grace_secs: u64,
}

fn default_cleanup_interval() -> u64 {
    60
}
fn default_reconcile_interval() -> u64 {
    6 * 3600
}
fn default_reconcile_grace() -> u64 {
    600
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval(),
            reconcile_interval_secs: default_reconcile_interval(),
            reconcile_grace_secs: default_reconcile_grace(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Deadline for recording a single click.
    #[serde(default = "default_analytics_timeout")]
    pub timeout_secs: u64,
    /// Clicks recorded concurrently before new ones are dropped.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_analytics_timeout() -> u64 {
    10
}
fn default_max_in_flight() -> usize {
    256
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_analytics_timeout(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

/// Optional first account created at startup.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BootstrapConfig {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub geoip: GeoIpConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            // Load from config/depot.toml
            .add_source(File::with_name("config/depot").required(false))
            // Override from environment (e.g., DEPOT__AUTH__SECRET)
            .add_source(
                Environment::with_prefix("DEPOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that cannot be expressed through serde defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.secret must not be empty".into()));
        }
        if self.upload.max_size == 0 {
            return Err(ConfigError::Message("upload.max_size must be positive".into()));
        }
        if self.upload.expires_in.is_zero() {
            return Err(ConfigError::Message(
                "upload.expires_in must be positive".into(),
            ));
        }
        if self.storage.provider == StorageProvider::Object
            && self
                .storage
                .object
                .as_ref()
                .is_none_or(|o| o.bucket.trim().is_empty())
        {
            return Err(ConfigError::Message(
                "storage.object.bucket is required when storage.provider = \"object\"".into(),
            ));
        }
        if self.analytics.max_in_flight == 0 {
            return Err(ConfigError::Message(
                "analytics.max_in_flight must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Public origin without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.server.base_url.trim_end_matches('/')
    }
}
