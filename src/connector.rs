//! Broker connection establishment with bounded, fixed-delay retry.
//!
//! ```text
//! Disconnected -> Connecting(1) -> Connected
//!                     |
//!                     v (transient failure, attempts < max)
//!                 Connecting(n) -> ... -> Failed
//! ```
//!
//! Only `BrokerError::Connection` is retried. Any other error, such as a
//! malformed endpoint, fails on the spot.

use std::time::Duration;

use backon::{BackoffBuilder, ConstantBuilder};
use tracing::{error, info, warn};

use crate::broker::{Broker, BrokerError};
use crate::config::BrokerEndpoint;

/// Default number of connection attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 30;
/// Default pause between connection attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Everything the connector needs for one run.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub endpoint: BrokerEndpoint,
    /// Total attempts, including the first.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl ConnectorConfig {
    pub fn new(endpoint: BrokerEndpoint) -> Self {
        Self {
            endpoint,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Delay schedule between attempts: `max_retries - 1` fixed pauses.
    fn retry_delays(&self) -> impl Iterator<Item = Duration> {
        let pauses = self.max_retries.max(1) - 1;
        ConstantBuilder::default()
            .with_delay(self.retry_delay)
            .with_max_times(pauses as usize)
            .build()
    }
}

/// Lifecycle of the producer's broker link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting { attempt: u32 },
    Connected { attempts: u32 },
    Failed { attempts: u32 },
}

impl ConnectionState {
    /// Connection attempts made so far.
    pub fn attempts(&self) -> u32 {
        match *self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting { attempt } => attempt,
            ConnectionState::Connected { attempts } | ConnectionState::Failed { attempts } => {
                attempts
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Failed to connect to broker after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: BrokerError,
    },

    #[error("Broker connection cannot be retried: {0}")]
    Fatal(#[source] BrokerError),
}

/// Drives a `Broker` from `Disconnected` to `Connected` or `Failed`.
#[derive(Debug)]
pub struct Connector {
    config: ConnectorConfig,
    state: ConnectionState,
}

impl Connector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Connect to the configured endpoint, retrying transient failures.
    pub async fn establish<B: Broker>(&mut self, broker: &B) -> Result<B::Connection, ConnectError> {
        let max_retries = self.config.max_retries.max(1);
        let mut delays = self.config.retry_delays();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.state = ConnectionState::Connecting { attempt };
            info!(
                attempt,
                max_retries,
                address = %self.config.endpoint.address(),
                "Attempting to connect to broker (attempt {}/{})",
                attempt,
                max_retries
            );

            let error = match broker.connect(&self.config.endpoint).await {
                Ok(connection) => {
                    self.state = ConnectionState::Connected { attempts: attempt };
                    info!(attempts = attempt, "Successfully connected to broker");
                    return Ok(connection);
                }
                Err(e) => e,
            };

            if !error.is_transient() {
                self.state = ConnectionState::Failed { attempts: attempt };
                error!(error = %error, "Broker connection failed with a non-retryable error");
                return Err(ConnectError::Fatal(error));
            }

            match delays.next() {
                Some(delay) => {
                    warn!(
                        attempt,
                        max_retries,
                        error = %error,
                        "Connection failed, retrying in {:?}...",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    self.state = ConnectionState::Failed { attempts: attempt };
                    error!(
                        attempts = attempt,
                        error = %error,
                        "Failed to connect to broker after maximum retries"
                    );
                    return Err(ConnectError::Exhausted {
                        attempts: attempt,
                        source: error,
                    });
                }
            }
        }
    }
}
