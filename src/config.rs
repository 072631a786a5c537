use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
///
/// All settings can be configured via environment variables with the `RECSYS_` prefix.
/// For example: `RECSYS_SERVER__PORT=8097`, `RECSYS_STORAGE__MODE=file`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Recommendation engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Interaction window used by fits, in days
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Exponential decay rate per day of event age
    #[serde(default = "default_decay_lambda")]
    pub decay_lambda: f32,

    /// Most-recent events considered per user for personalization
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Neighbors fetched for each history event
    #[serde(default = "default_neighbors")]
    pub neighbors_per_interaction: usize,

    /// Seconds between background refits (0 disables the worker)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_s: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            decay_lambda: default_decay_lambda(),
            history_limit: default_history_limit(),
            neighbors_per_interaction: default_neighbors(),
            refresh_interval_s: default_refresh_interval(),
        }
    }
}

fn default_lookback_days() -> u32 {
    90
}

fn default_decay_lambda() -> f32 {
    0.1
}

fn default_history_limit() -> usize {
    50
}

fn default_neighbors() -> usize {
    10
}

fn default_refresh_interval() -> u64 {
    3600
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// In-process collections, lost on restart
    #[default]
    Memory,
    /// Embedded redb database under `data_dir`
    File,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::File => f.write_str("file"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend used for interactions and the catalog
    #[serde(default)]
    pub mode: StorageMode,

    /// Directory holding the database file in `file` mode
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::default(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
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

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8097
}

impl ServerConfig {
    /// Returns the socket address for binding the server
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables should be prefixed with `RECSYS_` and use
    /// double underscores for nested values:
    /// - `RECSYS_ENGINE__LOOKBACK_DAYS` -> engine.lookback_days
    /// - `RECSYS_STORAGE__DATA_DIR` -> storage.data_dir
    /// - `RECSYS_SERVER__PORT` -> server.port
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("RECSYS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: Self = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lambda = self.engine.decay_lambda;
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(ConfigError::Message(format!(
                "engine.decay_lambda must be a positive number, got {lambda}"
            )));
        }
        if self.engine.lookback_days == 0 {
            return Err(ConfigError::Message(
                "engine.lookback_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
