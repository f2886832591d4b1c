//! Configuration management

use rand_core::{OsRng, RngCore};
use std::fmt;
use std::path::PathBuf;

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://fluxion.db";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default directory for uploaded raw files.
pub const DEFAULT_UPLOAD_FOLDER: &str = "uploads";

/// Maximum accepted upload size (16 MiB).
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

/// File extensions accepted by the dataset upload.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// Default lifetime of a login session in hours.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Lifetime of a "remember me" session in days.
pub const DEFAULT_REMEMBER_ME_DAYS: i64 = 30;

/// Minimum length of the session signing secret.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub session: SessionConfig,
    /// Overrides the request host when composing share URLs.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
    pub allowed_extensions: Vec<String>,
}

#[derive(Clone)]
pub struct SessionConfig {
    pub secret: Vec<u8>,
    pub ttl_hours: i64,
    pub remember_days: i64,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl_hours", &self.ttl_hours)
            .field("remember_days", &self.remember_days)
            .finish()
    }
}

impl UploadConfig {
    /// Case-insensitive check of a bare extension against the allowed set.
    pub fn is_allowed(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            },
            uploads: UploadConfig {
                dir: PathBuf::from(DEFAULT_UPLOAD_FOLDER),
                max_bytes: DEFAULT_MAX_CONTENT_LENGTH,
                allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            },
            session: SessionConfig {
                secret: random_secret(),
                ttl_hours: DEFAULT_SESSION_TTL_HOURS,
                remember_days: DEFAULT_REMEMBER_ME_DAYS,
            },
            public_base_url: None,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Config::default();

        if let Ok(host) = std::env::var("FLUXION_HOST") {
            config.server.host = host;
        }
        config.server.port = env_parse("FLUXION_PORT").unwrap_or(DEFAULT_SERVER_PORT);
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        config.database.max_connections = env_parse("DATABASE_MAX_CONNECTIONS")
            .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS);
        if let Ok(dir) = std::env::var("UPLOAD_FOLDER") {
            config.uploads.dir = PathBuf::from(dir);
        }
        config.uploads.max_bytes =
            env_parse("MAX_CONTENT_LENGTH").unwrap_or(DEFAULT_MAX_CONTENT_LENGTH);
        config.session.ttl_hours =
            env_parse("SESSION_TTL_HOURS").unwrap_or(DEFAULT_SESSION_TTL_HOURS);
        config.session.remember_days =
            env_parse("REMEMBER_ME_DAYS").unwrap_or(DEFAULT_REMEMBER_ME_DAYS);
        config.public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        match std::env::var("SECRET_KEY") {
            Ok(secret) => config.session.secret = secret.into_bytes(),
            Err(_) => tracing::warn!(
                "SECRET_KEY is not set; using a random key, sessions will not survive a restart"
            ),
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.uploads.max_bytes == 0 {
            anyhow::bail!("MAX_CONTENT_LENGTH must be greater than 0");
        }

        if self.session.secret.len() < MIN_SECRET_LEN {
            anyhow::bail!(
                "SECRET_KEY must be at least {} bytes long (got {})",
                MIN_SECRET_LEN,
                self.session.secret.len()
            );
        }

        if self.session.ttl_hours <= 0 || self.session.remember_days <= 0 {
            anyhow::bail!("Session lifetimes must be positive");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 64];
    OsRng.fill_bytes(&mut secret);
    secret
}
