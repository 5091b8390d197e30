use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Largest number of decimals a base-unit amount can be scaled by
pub const MAX_XEC_DECIMALS: u8 = 9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// General system settings
    pub system: SystemSettings,

    /// Indexer access
    pub indexer: IndexerConfig,

    /// Wallet view settings
    pub wallet: WalletConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Enable debug mode
    pub debug_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Offline indexer snapshot (JSON) read by the command line tool
    pub snapshot_path: String,

    /// Records requested per history page
    pub history_page_size: u32,

    /// Upper bound on pages fetched per address
    pub max_history_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Number of transactions kept in the history view
    pub tx_history_count: usize,

    /// Decimals of the XEC base unit
    pub xec_decimals: u8,

    /// Attempt to decrypt received encrypted messages with the wallet's keys
    pub decrypt_messages: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when RUST_LOG is unset
    pub filter: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            system: SystemSettings { debug_mode: false },
            indexer: IndexerConfig {
                snapshot_path: "wallet_snapshot.json".to_string(),
                history_page_size: 25,
                max_history_pages: 4,
            },
            wallet: WalletConfig {
                tx_history_count: 10,
                xec_decimals: 2,
                decrypt_messages: true,
            },
            logging: LoggingConfig {
                filter: "info".to_string(),
            },
        }
    }
}

impl IndexerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_page_size == 0 {
            return Err(ConfigurationError::InvalidValue(
                "indexer.history_page_size must be greater than 0".to_string(),
            ));
        }

        if self.max_history_pages == 0 {
            return Err(ConfigurationError::InvalidValue(
                "indexer.max_history_pages must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl WalletConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tx_history_count == 0 {
            return Err(ConfigurationError::InvalidValue(
                "wallet.tx_history_count must be greater than 0".to_string(),
            ));
        }

        if self.xec_decimals > MAX_XEC_DECIMALS {
            return Err(ConfigurationError::InvalidValue(format!(
                "wallet.xec_decimals must be at most {}, got {}",
                MAX_XEC_DECIMALS, self.xec_decimals
            )));
        }

        Ok(())
    }
}

impl SystemConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        // e.g. XEC__WALLET__TX_HISTORY_COUNT=20
        config_builder = config_builder.add_source(
            Environment::with_prefix("XEC")
                .try_parsing(true)
                .separator("__"),
        );

        let system_config: SystemConfig = config_builder.build()?.try_deserialize()?;
        system_config.validate()?;

        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.indexer.validate()?;
        self.wallet.validate()?;

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "logging.filter cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration manager for loading and managing system configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: SystemConfig,
}

impl ConfigManager {
    /// Create a new configuration manager from `config.toml`
    pub fn new() -> Result<Self> {
        let config = SystemConfig::load()?;
        info!("Configuration loaded successfully");
        debug!("Configuration: {:#?}", config);

        Ok(Self { config })
    }

    /// Create configuration manager from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = SystemConfig::load_from_path(path.as_ref())?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }
}
