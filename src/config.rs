// src/config.rs
use dotenvy::dotenv;
use serde::Deserialize;
use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::info;

use crate::fetcher::REQUEST_TIMEOUT;
use crate::governor::MAX_CONCURRENT_REQUESTS;
use crate::rate_limiter::MIN_REQUEST_INTERVAL;
use crate::scheduler::CHUNK_COUNT;

/// Upper bound for `min_request_interval_secs` (one day)
const MAX_REQUEST_INTERVAL_SECS: f64 = 86_400.0;

/// One network and its RPC endpoints, in the order they appear in the file
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub name: String,
    pub rpcs: Vec<String>,
}

/// Engine tunables (`[engine]`, every key optional)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub min_request_interval_secs: f64,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
    pub chunk_count: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_request_interval_secs: MIN_REQUEST_INTERVAL.as_secs_f64(),
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            request_timeout_secs: REQUEST_TIMEOUT.as_secs(),
            chunk_count: CHUNK_COUNT,
        }
    }
}

impl EngineSettings {
    pub fn min_request_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.min_request_interval_secs)
            .unwrap_or(MIN_REQUEST_INTERVAL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub networks: Vec<NetworkConfig>,
    pub thresholds: HashMap<String, f64>, // lowercase network name -> highlight threshold
    pub engine: EngineSettings,
    pub wallets_path: PathBuf,
    pub report_dir: PathBuf,
}

impl Config {
    pub fn network_names(&self) -> Vec<String> {
        self.networks.iter().map(|n| n.name.clone()).collect()
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    networks: toml::Table,
    #[serde(default)]
    thresholds: HashMap<String, f64>,
    #[serde(default)]
    engine: EngineSettings,
}

#[derive(Debug, Deserialize)]
struct NetworkSection {
    rpcs: Vec<String>,
}

/// Load everything from the environment (and `.env`), then the TOML file it points at
pub fn load() -> eyre::Result<Config> {
    dotenv().ok();

    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let mut cfg = load_config(&config_path)?;

    if let Ok(path) = env::var("WALLETS_PATH") {
        cfg.wallets_path = PathBuf::from(path);
    }
    if let Ok(dir) = env::var("REPORT_DIR") {
        cfg.report_dir = PathBuf::from(dir);
    }

    info!("Loaded config from {}:", config_path);
    for network in &cfg.networks {
        info!("  {}: {} RPCs", network.name, network.rpcs.len());
    }
    info!("  Thresholds: {:?}", cfg.thresholds);
    info!("  Engine: {:?}", cfg.engine);

    Ok(cfg)
}

/// Load and validate a TOML config file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let file: FileConfig = toml::from_str(content)?;

    let mut networks = Vec::with_capacity(file.networks.len());
    for (name, value) in file.networks {
        let section: NetworkSection = value.try_into()?;
        networks.push(NetworkConfig {
            name,
            rpcs: section.rpcs.into_iter().map(|u| u.trim().to_string()).collect(),
        });
    }

    let thresholds = file
        .thresholds
        .into_iter()
        .map(|(network, value)| (network.to_lowercase(), value))
        .collect();

    let cfg = Config {
        networks,
        thresholds,
        engine: file.engine,
        wallets_path: PathBuf::from("wallets.txt"),
        report_dir: PathBuf::from("."),
    };
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.networks.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one network must be configured".to_string(),
            ));
        }

        for network in &self.networks {
            if network.rpcs.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "network {} has no rpcs",
                    network.name
                )));
            }
            if network.rpcs.iter().any(|u| u.is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "network {} has an empty rpc url",
                    network.name
                )));
            }
        }

        let interval = self.engine.min_request_interval_secs;
        let representable = Duration::try_from_secs_f64(interval).is_ok();
        if !representable || interval > MAX_REQUEST_INTERVAL_SECS {
            return Err(ConfigError::ValidationError(format!(
                "min_request_interval_secs must be between 0 and {}, got {}",
                MAX_REQUEST_INTERVAL_SECS, interval
            )));
        }
        if self.engine.max_concurrent_requests == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_requests must be > 0".to_string(),
            ));
        }
        if self.engine.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.engine.chunk_count == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_count must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
