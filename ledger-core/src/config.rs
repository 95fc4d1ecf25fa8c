//! Configuration for the ledger

use ranking_engine::ScoringConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Which store backs the ledger
    pub storage: StorageBackend,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Account configuration
    pub accounts: AccountConfig,

    /// Actor configuration
    pub actor: ActorConfig,

    /// Feed ranking configuration
    pub ranking: ScoringConfig,

    /// Logging configuration
    pub log: LogConfig,

    /// Collect Prometheus metrics
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "ledger-core".to_string(),
            data_dir: PathBuf::from("./data/ledger"),
            storage: StorageBackend::Memory,
            rocksdb: RocksDBConfig::default(),
            accounts: AccountConfig::default(),
            actor: ActorConfig::default(),
            ranking: ScoringConfig::default(),
            log: LogConfig::default(),
            metrics_enabled: true,
        }
    }
}

/// Store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// In-process maps, lost on restart
    Memory,
    /// RocksDB under `data_dir` (requires the `rocksdb` feature)
    Rocksdb,
}

impl FromStr for StorageBackend {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::Rocksdb),
            other => Err(crate::Error::Config(format!(
                "Unknown storage backend: {}",
                other
            ))),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 3,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Coins granted to a newly opened account
    pub starting_balance: Decimal,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::from(100),
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("FEED_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(backend) = std::env::var("FEED_STORAGE_BACKEND") {
            config.storage = backend.parse()?;
        }

        if let Ok(balance) = std::env::var("FEED_STARTING_BALANCE") {
            config.accounts.starting_balance = Decimal::from_str(&balance).map_err(|e| {
                crate::Error::Config(format!("Invalid FEED_STARTING_BALANCE: {}", e))
            })?;
        }

        if let Ok(capacity) = std::env::var("FEED_MAILBOX_CAPACITY") {
            config.actor.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid FEED_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        if let Ok(level) = std::env::var("FEED_LOG_LEVEL") {
            config.log.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> crate::Result<()> {
        if self.accounts.starting_balance < Decimal::ZERO {
            return Err(crate::Error::Config(
                "starting_balance must not be negative".to_string(),
            ));
        }

        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "mailbox_capacity must be positive".to_string(),
            ));
        }

        self.ranking
            .validate()
            .map_err(|e| crate::Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "ledger-core");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.accounts.starting_balance, Decimal::from(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml(
            r#"
            storage = "rocksdb"
            data_dir = "/var/lib/feed"

            [accounts]
            starting_balance = "25.50"

            [ranking]
            flag_weight = 8.0
            "#,
        )
        .unwrap();

        assert_eq!(config.storage, StorageBackend::Rocksdb);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/feed"));
        assert_eq!(config.accounts.starting_balance, Decimal::new(2550, 2));
        assert_eq!(config.ranking.flag_weight, 8.0);
        assert_eq!(config.ranking.comment_weight, 2.0);
        assert_eq!(config.actor.mailbox_capacity, 1000);
    }

    #[test]
    fn test_invalid_ranking_rejected() {
        let err = Config::from_toml("[ranking]\ndecay_exponent = 0.0").unwrap_err();
        assert_eq!(err.reason_code(), "config");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(&path, "metrics_enabled = false\n[log]\njson = true\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(!config.metrics_enabled);
        assert!(config.log.json);
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("RocksDB".parse::<StorageBackend>().unwrap(), StorageBackend::Rocksdb);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }
}
