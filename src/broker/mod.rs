//! Message broker abstraction.
//!
//! This module contains:
//! - `Broker` trait: opens a connection to a broker endpoint
//! - `BrokerConnection` trait: queue declaration and publishing over one link
//! - `DeliveryMode`: per-message durability flag
//! - Implementations: AMQP (RabbitMQ), Mock

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::BrokerEndpoint;
use crate::queue::QueueName;

// Implementation modules
#[cfg(feature = "amqp")]
pub mod amqp;
pub mod mock;

// Re-exports
#[cfg(feature = "amqp")]
pub use amqp::{AmqpBroker, AmqpConnection};
pub use mock::{BrokerOp, MockBroker, MockConnection, PublishedMessage};

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Broker unreachable or refused the link. The only retryable kind.
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid broker endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Queue '{queue}' already exists with incompatible settings: {message}")]
    QueueConflict { queue: String, message: String },

    #[error("Declare of queue '{queue}' failed: {message}")]
    Declare { queue: String, message: String },

    #[error("Publish to queue '{queue}' failed: {message}")]
    Publish { queue: String, message: String },

    #[error("Connection closed: {0}")]
    Closed(String),
}

impl BrokerError {
    /// Whether the connector may retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, BrokerError::Connection(_))
    }
}

/// Delivery mode attached to every published message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Message may be lost on broker restart.
    Transient,
    /// Broker writes the message to durable storage.
    #[default]
    Persistent,
}

impl DeliveryMode {
    /// AMQP `delivery-mode` property value.
    pub fn as_amqp(self) -> u8 {
        match self {
            DeliveryMode::Transient => 1,
            DeliveryMode::Persistent => 2,
        }
    }
}

/// Opens connections to a broker.
///
/// Implementations:
/// - `AmqpBroker`: RabbitMQ via lapin
/// - `MockBroker`: In-memory broker for testing
#[async_trait]
pub trait Broker: Send + Sync {
    type Connection: BrokerConnection;

    /// Make a single connection attempt.
    ///
    /// Unreachable brokers surface as `BrokerError::Connection`; a malformed
    /// endpoint surfaces as `BrokerError::InvalidEndpoint`.
    async fn connect(&self, endpoint: &BrokerEndpoint) -> Result<Self::Connection>;
}

/// An open link to the broker.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Declare `queue` as durable, non-exclusive and non-auto-delete.
    ///
    /// Redeclaring with identical settings is a no-op. An existing queue with
    /// different settings fails with `BrokerError::QueueConflict`.
    async fn declare_durable_queue(&self, queue: &QueueName) -> Result<()>;

    /// Publish `body` to `queue` through the default exchange.
    async fn publish(&self, queue: &QueueName, body: &[u8], mode: DeliveryMode) -> Result<()>;

    /// Close the link gracefully.
    async fn close(self) -> Result<()>;
}
