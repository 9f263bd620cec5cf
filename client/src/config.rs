//! Client Configuration
//!
//! Handles loading and saving client configuration from TOML files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Full client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Chain the contracts live on
    pub chain_id: u64,

    /// User decryption settings
    #[serde(default)]
    pub decryption: DecryptionConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chain_id: 31337,
            decryption: DecryptionConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.decryption;
        if d.validity_days == 0 {
            return Err(ConfigError::Invalid(
                "Validity must be at least one day".to_string(),
            ));
        }

        if d.validity_days > d.max_validity_days {
            return Err(ConfigError::Invalid(format!(
                "Validity of {} days exceeds maximum {}",
                d.validity_days, d.max_validity_days
            )));
        }

        if d.oracle_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Oracle timeout must be greater than 0".to_string(),
            ));
        }

        if d.domain_name.is_empty() || d.domain_version.is_empty() {
            return Err(ConfigError::Invalid(
                "Signing domain name and version are required".to_string(),
            ));
        }

        Ok(())
    }
}

/// User decryption settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionConfig {
    /// Lifetime of a signed authorization
    pub validity_days: u64,

    /// Longest lifetime the oracle accepts
    pub max_validity_days: u64,

    /// Oracle round-trip timeout in milliseconds
    pub oracle_timeout_ms: u64,

    /// Signing domain name
    pub domain_name: String,

    /// Signing domain version
    pub domain_version: String,
}

impl Default for DecryptionConfig {
    fn default() -> Self {
        Self {
            validity_days: 10,
            max_validity_days: 365,
            oracle_timeout_ms: 30_000,
            domain_name: "Decryption".to_string(),
            domain_version: "1".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,

    /// Output format (text, json)
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Builder for client configuration
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.config.chain_id = chain_id;
        self
    }

    /// Set authorization lifetime
    pub fn validity_days(mut self, days: u64) -> Self {
        self.config.decryption.validity_days = days;
        self
    }

    /// Set the longest lifetime the oracle accepts
    pub fn max_validity_days(mut self, days: u64) -> Self {
        self.config.decryption.max_validity_days = days;
        self
    }

    /// Set oracle timeout
    pub fn oracle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.decryption.oracle_timeout_ms = ms;
        self
    }

    /// Set signing domain name and version
    pub fn domain(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.config.decryption.domain_name = name.into();
        self.config.decryption.domain_version = version.into();
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
