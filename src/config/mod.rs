//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (empty = any origin)
    pub client_origins: Vec<String>,

    /// Room tick period
    pub tick: Duration,
    /// Global enemy speed multiplier
    pub enemy_speed_scale: f32,
    /// How long a room may sit without players before it is evicted (None = never)
    pub room_idle_timeout: Option<Duration>,
    /// Optional JSON file replacing the built-in enemy catalog
    pub enemy_catalog_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let tick_ms: u64 = parse_var("TICK_MS", 50)?;
        if tick_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "TICK_MS",
                value: tick_ms.to_string(),
            });
        }

        let enemy_speed_scale: f32 = parse_var("ENEMY_SPEED_SCALE", 0.6)?;
        if !enemy_speed_scale.is_finite() || enemy_speed_scale <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "ENEMY_SPEED_SCALE",
                value: enemy_speed_scale.to_string(),
            });
        }

        let idle_secs: u64 = parse_var("ROOM_IDLE_TIMEOUT_SECS", 300)?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origins: env::var("CLIENT_ORIGIN")
                .map(|origins| split_origins(&origins))
                .unwrap_or_default(),

            tick: Duration::from_millis(tick_ms),
            enemy_speed_scale,
            room_idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            enemy_catalog_path: env::var("ENEMY_CATALOG_PATH").ok().map(PathBuf::from),
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset
fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Failed to read enemy catalog {path}: {source}")]
    CatalogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Catalog(#[from] crate::game::catalog::CatalogError),

    #[error("Invalid game rules: {0}")]
    Rules(String),
}
