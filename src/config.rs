//! Configuration management for powledger

use crate::amount::Amount;
use crate::error::ChainError;
use crate::mempool::DEFAULT_MAX_SIZE;
use crate::miner::{DEFAULT_CHECK_INTERVAL, MAX_DIFFICULTY};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "powledger.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub miner: MinerConfig,
    pub mempool: MempoolConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LedgerConfig {
    /// Required leading zero hex digits in a block hash
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_mining_reward")]
    pub mining_reward: Amount,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MinerConfig {
    /// Nonces tried between cancellation checks
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MempoolConfig {
    #[serde(default = "default_mempool_size")]
    pub max_size: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_size: default_mempool_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

fn default_difficulty() -> u32 {
    4
}

fn default_mining_reward() -> Amount {
    Amount::from_coins(50)
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL
}

fn default_mempool_size() -> usize {
    DEFAULT_MAX_SIZE
}

fn default_api_port() -> u16 {
    3000
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.ledger.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "ledger.difficulty must be at most {} (got {})",
                MAX_DIFFICULTY, self.ledger.difficulty
            )));
        }
        if self.ledger.mining_reward.is_negative() {
            return Err(ChainError::ConfigError(
                "ledger.mining_reward cannot be negative".to_string(),
            ));
        }
        if self.miner.check_interval == 0 {
            return Err(ChainError::ConfigError(
                "miner.check_interval must be greater than zero".to_string(),
            ));
        }
        if self.mempool.max_size == 0 {
            return Err(ChainError::ConfigError(
                "mempool.max_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads `powledger.toml` from the working directory, falling back to
/// defaults when the file is absent.
pub fn load_config() -> Result<Config, ChainError> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if !path.exists() {
        tracing::debug!(path = DEFAULT_CONFIG_FILE, "no config file, using defaults");
        return Ok(Config::default());
    }
    load_config_from(path)
}

pub fn load_config_from(path: &Path) -> Result<Config, ChainError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ChainError::ConfigError(format!("failed to read {}: {}", path.display(), e))
    })?;
    Config::from_toml_str(&contents)
}
