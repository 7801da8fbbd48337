use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub webauthn: WebAuthnConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to make credentialed CORS requests
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Directory holding a built frontend, served for non-API paths
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_max_age")]
    pub max_age_days: i64,
    #[serde(default)]
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Bucket,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_local_path")]
    pub local_path: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub bucket: BucketConfig,
}

/// Object storage bucket credentials
#[derive(Debug, Clone, Deserialize)]
pub struct BucketConfig {
    #[serde(default)]
    pub secret_id: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: String,
    /// Overrides the `<bucket>.cos.<region>.myqcloud.com` host
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub base_path: String,
    #[serde(default = "default_presign_secs")]
    pub presign_expire_secs: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebAuthnConfig {
    #[serde(default = "default_rp_id")]
    pub rp_id: String,
    #[serde(default = "default_rp_name")]
    pub rp_name: String,
    #[serde(default = "default_rp_origin")]
    pub rp_origin: String,
    /// Additional origins accepted during ceremonies (dev servers on other ports)
    #[serde(default)]
    pub extra_origins: Vec<String>,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_allowed_origins() -> Vec<String> {
    [
        "http://localhost:5173",
        "http://localhost:5174",
        "http://localhost:5175",
        "http://localhost:3000",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_db_path() -> String {
    "data/workout.db".to_string()
}

fn default_session_max_age() -> i64 {
    7
}

fn default_local_path() -> String {
    "data/uploads".to_string()
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_presign_secs() -> u32 {
    3600
}

fn default_rp_id() -> String {
    "localhost".to_string()
}

fn default_rp_name() -> String {
    "Workout Progress Gallery".to_string()
}

fn default_rp_origin() -> String {
    "http://localhost:5173".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            static_dir: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_session_max_age(),
            cookie_secure: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_path: default_local_path(),
            max_upload_bytes: default_max_upload_bytes(),
            bucket: BucketConfig::default(),
        }
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            secret_id: String::new(),
            secret_key: String::new(),
            bucket: String::new(),
            region: String::new(),
            endpoint: None,
            base_path: String::new(),
            presign_expire_secs: default_presign_secs(),
        }
    }
}

impl Default for WebAuthnConfig {
    fn default() -> Self {
        Self {
            rp_id: default_rp_id(),
            rp_name: default_rp_name(),
            rp_origin: default_rp_origin(),
            extra_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        config.ensure_webauthn_defaults();
        tracing::info!(
            "WebAuthn config: rp_id={}, rp_origin={}, rp_name={}",
            config.webauthn.rp_id,
            config.webauthn.rp_origin,
            config.webauthn.rp_name
        );
        Ok(config)
    }

    /// Session lifetime
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session.max_age_days)
    }

    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: WPG_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("WPG_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("WPG_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = env::var("WPG_CONF_SERVER_ALLOWED_ORIGINS") {
            self.server.allowed_origins = split_list(&val);
        }
        if let Ok(val) = env::var("WPG_CONF_SERVER_STATIC_DIR") {
            if !val.trim().is_empty() {
                self.server.static_dir = Some(val);
            }
        }

        if let Ok(val) = env::var("WPG_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        if let Ok(val) = env::var("WPG_CONF_SESSION_MAX_AGE_DAYS") {
            if let Ok(days) = val.parse() {
                self.session.max_age_days = days;
            }
        }
        if let Ok(val) = env::var("WPG_CONF_SESSION_COOKIE_SECURE") {
            if let Ok(v) = val.parse() {
                self.session.cookie_secure = v;
            }
        }

        if let Ok(val) = env::var("WPG_CONF_STORAGE_BACKEND") {
            match val.trim().to_lowercase().as_str() {
                "local" => self.storage.backend = StorageBackend::Local,
                "bucket" => self.storage.backend = StorageBackend::Bucket,
                other => tracing::warn!("Ignoring unknown storage backend: {}", other),
            }
        }
        if let Ok(val) = env::var("WPG_CONF_STORAGE_LOCAL_PATH") {
            self.storage.local_path = val;
        }
        if let Ok(val) = env::var("WPG_CONF_STORAGE_BUCKET_SECRET_ID") {
            self.storage.bucket.secret_id = val;
        }
        if let Ok(val) = env::var("WPG_CONF_STORAGE_BUCKET_SECRET_KEY") {
            self.storage.bucket.secret_key = val;
        }
        if let Ok(val) = env::var("WPG_CONF_STORAGE_BUCKET_NAME") {
            self.storage.bucket.bucket = val;
        }
        if let Ok(val) = env::var("WPG_CONF_STORAGE_BUCKET_REGION") {
            self.storage.bucket.region = val;
        }
        if let Ok(val) = env::var("WPG_CONF_STORAGE_BUCKET_ENDPOINT") {
            if !val.trim().is_empty() {
                self.storage.bucket.endpoint = Some(val);
            }
        }

        if let Ok(val) = env::var("WPG_CONF_WEBAUTHN_RP_ID") {
            if !val.trim().is_empty() {
                self.webauthn.rp_id = val;
            }
        }
        if let Ok(val) = env::var("WPG_CONF_WEBAUTHN_RP_NAME") {
            if !val.trim().is_empty() {
                self.webauthn.rp_name = val;
            }
        }
        if let Ok(val) = env::var("WPG_CONF_WEBAUTHN_RP_ORIGIN") {
            if !val.trim().is_empty() {
                self.webauthn.rp_origin = val;
            }
        }
        if let Ok(val) = env::var("WPG_CONF_WEBAUTHN_EXTRA_ORIGINS") {
            self.webauthn.extra_origins = split_list(&val);
        }
    }

    fn ensure_webauthn_defaults(&mut self) {
        if self.webauthn.rp_id.trim().is_empty() {
            self.webauthn.rp_id = default_rp_id();
        }
        if self.webauthn.rp_name.trim().is_empty() {
            self.webauthn.rp_name = default_rp_name();
        }
        if self.webauthn.rp_origin.trim().is_empty() {
            self.webauthn.rp_origin = default_rp_origin();
        }
    }

    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        if self.storage.backend == StorageBackend::Local {
            fs::create_dir_all(&self.storage.local_path)?;
        }

        Ok(())
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.session.max_age_days, 7);
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.webauthn.rp_name, "Workout Progress Gallery");
        assert!(config
            .server
            .allowed_origins
            .contains(&"http://localhost:5173".to_string()));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [storage]
            backend = "bucket"

            [storage.bucket]
            bucket = "photos-1250000000"
            region = "ap-guangzhou"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.backend, StorageBackend::Bucket);
        assert_eq!(config.storage.bucket.region, "ap-guangzhou");
        assert_eq!(config.storage.bucket.presign_expire_secs, 3600);
        assert_eq!(config.database.path, "data/workout.db");
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" http://a , ,http://b"),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
    }
}
