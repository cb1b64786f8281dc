//! Configuration management for the room availability engine
//!
//! Multi-source loading with zero-config defaults: built-in values, then an
//! optional TOML file from the standard locations or an explicit override.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::cache::CacheOptions;
use crate::app::ClientConfig;
use crate::constants::{cache, limits, workers};
use crate::errors::ConfigError;

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Snapshot cache settings
    pub cache: CacheConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Retry budget for transient failures
    pub max_retries: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout_secs: 20,
            connect_timeout_secs: 10,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            max_retries: limits::MAX_RETRIES,
        }
    }
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Snapshot time-to-live, human-readable ("1h", "30m")
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Snapshot persistence path (None = platform cache directory)
    pub state_file: Option<PathBuf>,
    /// Concurrent in-flight room fetches per refresh pass
    pub worker_count: usize,
    /// Serve a stale snapshot while refreshing in the background, instead
    /// of blocking consumers on the pass
    pub serve_stale: bool,
}

impl Default for CacheConfigToml {
    fn default() -> Self {
        Self {
            ttl: cache::DEFAULT_TTL,
            state_file: None,
            worker_count: workers::DEFAULT_WORKER_COUNT,
            serve_stale: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit override, or the first standard location)
    pub async fn load_or_default(path_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_path = match path_override {
            Some(path) => Some(path),
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("no config file found, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Find a configuration file in the standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from("./ade-rooms.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join(cache::APP_DIR_NAME).join("config.toml"));
        }

        search_paths.into_iter().find(|path| {
            if path.exists() {
                debug!(path = %path.display(), "found config file");
                true
            } else {
                false
            }
        })
    }

    async fn load_from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::NotReadable {
                    path: path.clone(),
                    source,
                })?;
        let config: AppConfig = toml::from_str(&content)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.cache.worker_count == 0 || self.cache.worker_count > workers::MAX_WORKER_COUNT {
            return Err(ConfigError::InvalidValue {
                field: "cache.worker_count".to_string(),
                reason: format!("must be between 1 and {}", workers::MAX_WORKER_COUNT),
            });
        }
        Ok(())
    }

    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> (ClientConfig, CacheOptions) {
        (self.client.to_runtime_config(), self.cache.to_runtime_config())
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
            max_retries: self.max_retries,
        }
    }
}

impl CacheConfigToml {
    /// Convert to runtime CacheOptions
    pub fn to_runtime_config(&self) -> CacheOptions {
        CacheOptions {
            ttl: self.ttl,
            state_file: self
                .state_file
                .clone()
                .or_else(crate::app::cache::default_state_file),
        }
    }
}
