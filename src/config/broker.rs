//! Broker endpoint configuration.

use std::fmt;

use serde::Deserialize;

use crate::broker::BrokerError;

/// Default AMQP port.
pub const DEFAULT_AMQP_PORT: u16 = 5672;

/// Where and how to reach the broker.
///
/// Immutable for the duration of a producer run.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BrokerEndpoint {
    /// Broker hostname or IP address.
    pub host: String,
    /// AMQP port.
    pub port: u16,
    /// Username for PLAIN authentication.
    pub username: String,
    /// Password for PLAIN authentication.
    pub password: String,
    /// Virtual host.
    pub vhost: String,
}

impl Default for BrokerEndpoint {
    fn default() -> Self {
        Self {
            host: "rabbitmq".to_string(),
            port: DEFAULT_AMQP_PORT,
            username: "admin".to_string(),
            password: "admin123".to_string(),
            vhost: "/".to_string(),
        }
    }
}

impl BrokerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// `host:port`, for logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject endpoints no connection attempt could ever succeed with.
    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.host.trim().is_empty() {
            return Err(BrokerError::InvalidEndpoint("host is empty".to_string()));
        }
        if self.host.chars().any(char::is_whitespace) {
            return Err(BrokerError::InvalidEndpoint(format!(
                "host '{}' contains whitespace",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(BrokerError::InvalidEndpoint("port must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("vhost", &self.vhost)
            .finish()
    }
}
