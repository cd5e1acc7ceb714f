//! Producer configuration.
//!
//! Aggregates broker, connector and publisher settings into a single Config
//! struct that can be loaded from YAML files or environment variables.

mod broker;

pub use broker::{BrokerEndpoint, DEFAULT_AMQP_PORT};

use std::time::Duration;

use serde::Deserialize;

use crate::broker::DeliveryMode;
use crate::connector::{ConnectorConfig, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "brewbus.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "BREWBUS_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "BREWBUS";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "BREWBUS_LOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connection retry settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    /// Total connection attempts before giving up.
    pub max_retries: u32,
    /// Fixed delay between attempts, in seconds.
    pub retry_delay_secs: u64,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY.as_secs(),
        }
    }
}

/// Fan-out publisher settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PublisherSettings {
    /// Delivery mode for every published message.
    pub delivery_mode: DeliveryMode,
    /// Wait for a broker ack after each publish.
    pub wait_for_confirms: bool,
    /// Override for the domain's pause between events, in milliseconds.
    pub event_delay_ms: Option<u64>,
}

impl PublisherSettings {
    pub fn event_delay(&self) -> Option<Duration> {
        self.event_delay_ms.map(Duration::from_millis)
    }
}

/// Main producer configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker endpoint and credentials.
    pub broker: BrokerEndpoint,
    /// Connection retry settings.
    pub connector: ConnectorSettings,
    /// Publisher settings.
    pub publisher: PublisherSettings,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `brewbus.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.connector.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "connector.max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Connector settings resolved against the broker endpoint.
    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig::new(self.broker.clone())
            .with_max_retries(self.connector.max_retries)
            .with_retry_delay(Duration::from_secs(self.connector.retry_delay_secs))
    }
}
