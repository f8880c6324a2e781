//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Administration configuration.
    #[serde(default)]
    pub admin: AdminConfig,
    /// Weekly rotation configuration.
    #[serde(default)]
    pub rotation: RotationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Administration configuration.
///
/// Administrative endpoints (publishing polls, resolving contests, etc.)
/// require the configured token. When no token is set, those endpoints
/// reject every request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Shared secret expected in the `X-Admin-Token` header.
    #[serde(default)]
    pub token: Option<String>,
}

/// Weekly rotation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RotationConfig {
    /// Whether the rotation scheduler runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How often to check whether a new weekly poll should be featured,
    /// in seconds.
    #[serde(default = "default_rotation_check_secs")]
    pub check_interval_secs: u64,
    /// How often to close polls whose end time has passed, in seconds.
    #[serde(default = "default_close_check_secs")]
    pub close_interval_secs: u64,
    /// How long a featured weekly poll stays open, in days.
    #[serde(default = "default_weekly_duration_days")]
    pub weekly_duration_days: i64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            check_interval_secs: default_rotation_check_secs(),
            close_interval_secs: default_close_check_secs(),
            weekly_duration_days: default_weekly_duration_days(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_true() -> bool {
    true
}

const fn default_rotation_check_secs() -> u64 {
    3600
}

const fn default_close_check_secs() -> u64 {
    60
}

const fn default_weekly_duration_days() -> i64 {
    7
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `POLLBOX_ENV`)
    /// 3. Environment variables with `POLLBOX_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("POLLBOX_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("POLLBOX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("POLLBOX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
