//! AMQP (RabbitMQ) broker implementation.
//!
//! Publishes through the default exchange, so the routing key is the queue
//! name. One connection and one channel per producer run.

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions},
    protocol::{AMQPErrorKind, AMQPSoftError},
    publisher_confirm::Confirmation,
    types::FieldTable,
    uri::{AMQPAuthority, AMQPUri, AMQPUserInfo},
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tracing::debug;

use super::{Broker, BrokerConnection, BrokerError, DeliveryMode, Result};
use crate::config::BrokerEndpoint;
use crate::queue::QueueName;

/// Content type set on every published event.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// The default (nameless) direct exchange.
const DEFAULT_EXCHANGE: &str = "";

/// AMQP reply code for a normal connection close.
const REPLY_SUCCESS: u16 = 200;

/// RabbitMQ broker.
#[derive(Clone, Debug, Default)]
pub struct AmqpBroker {
    publisher_confirms: bool,
}

impl AmqpBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put channels in confirm mode and wait for the broker ack on every publish.
    pub fn with_publisher_confirms(mut self, enabled: bool) -> Self {
        self.publisher_confirms = enabled;
        self
    }

    /// Build the connection URI from structured parts so credentials never
    /// need escaping.
    fn uri(endpoint: &BrokerEndpoint) -> AMQPUri {
        AMQPUri {
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: endpoint.username.clone(),
                    password: endpoint.password.clone(),
                },
                host: endpoint.host.clone(),
                port: endpoint.port,
            },
            vhost: endpoint.vhost.clone(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    type Connection = AmqpConnection;

    async fn connect(&self, endpoint: &BrokerEndpoint) -> Result<AmqpConnection> {
        endpoint.validate()?;

        let connection = Connection::connect_uri(Self::uri(endpoint), ConnectionProperties::default())
            .await
            .map_err(|e| {
                BrokerError::Connection(format!("Failed to connect to {}: {}", endpoint.address(), e))
            })?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::Connection(format!("Failed to create channel: {}", e)))?;

        if self.publisher_confirms {
            channel
                .confirm_select(ConfirmSelectOptions::default())
                .await
                .map_err(|e| {
                    BrokerError::Connection(format!("Failed to enable publisher confirms: {}", e))
                })?;
        }

        debug!(
            address = %endpoint.address(),
            vhost = %endpoint.vhost,
            publisher_confirms = self.publisher_confirms,
            "Connected to AMQP"
        );

        Ok(AmqpConnection {
            connection,
            channel,
            publisher_confirms: self.publisher_confirms,
        })
    }
}

/// Open RabbitMQ connection with its publishing channel.
pub struct AmqpConnection {
    connection: Connection,
    channel: Channel,
    publisher_confirms: bool,
}

impl AmqpConnection {
    fn properties(mode: DeliveryMode) -> BasicProperties {
        BasicProperties::default()
            .with_content_type(JSON_CONTENT_TYPE.into())
            .with_delivery_mode(mode.as_amqp())
    }
}

/// Map a declare failure. RabbitMQ answers a redeclare with different
/// arguments with a 406 PRECONDITION_FAILED channel close.
fn declare_error(queue: &QueueName, error: lapin::Error) -> BrokerError {
    match &error {
        lapin::Error::ProtocolError(amqp_error)
            if matches!(
                amqp_error.kind(),
                AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED)
            ) =>
        {
            BrokerError::QueueConflict {
                queue: queue.to_string(),
                message: amqp_error.to_string(),
            }
        }
        lapin::Error::InvalidChannelState(_)
        | lapin::Error::InvalidConnectionState(_)
        | lapin::Error::IOError(_) => BrokerError::Closed(error.to_string()),
        _ => BrokerError::Declare {
            queue: queue.to_string(),
            message: error.to_string(),
        },
    }
}

fn publish_error(queue: &QueueName, error: lapin::Error) -> BrokerError {
    match &error {
        lapin::Error::InvalidChannelState(_)
        | lapin::Error::InvalidConnectionState(_)
        | lapin::Error::IOError(_) => BrokerError::Closed(error.to_string()),
        _ => BrokerError::Publish {
            queue: queue.to_string(),
            message: error.to_string(),
        },
    }
}

#[async_trait]
impl BrokerConnection for AmqpConnection {
    async fn declare_durable_queue(&self, queue: &QueueName) -> Result<()> {
        self.channel
            .queue_declare(
                queue.as_str(),
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| declare_error(queue, e))?;
        Ok(())
    }

    #[tracing::instrument(name = "broker.publish", skip_all, fields(queue = %queue))]
    async fn publish(&self, queue: &QueueName, body: &[u8], mode: DeliveryMode) -> Result<()> {
        let confirm = self
            .channel
            .basic_publish(
                DEFAULT_EXCHANGE,
                queue.as_str(),
                BasicPublishOptions::default(),
                body,
                Self::properties(mode),
            )
            .await
            .map_err(|e| publish_error(queue, e))?;

        if !self.publisher_confirms {
            return Ok(());
        }

        match confirm.await.map_err(|e| publish_error(queue, e))? {
            Confirmation::Nack(_) => Err(BrokerError::Publish {
                queue: queue.to_string(),
                message: "Broker nacked the message".to_string(),
            }),
            Confirmation::Ack(_) | Confirmation::NotRequested => {
                debug!("Publish confirmed by broker");
                Ok(())
            }
        }
    }

    async fn close(self) -> Result<()> {
        self.connection
            .close(REPLY_SUCCESS, "Normal shutdown")
            .await
            .map_err(|e| BrokerError::Closed(format!("Failed to close connection: {}", e)))
    }
}
