//! Producer pipeline: connect, provision, fan out every generated event,
//! close.
//!
//! Everything runs sequentially on one task. The only waits are the
//! connector's retry delay and the cosmetic pause between events.

use std::time::Duration;

use tracing::info;

use crate::broker::{Broker, BrokerConnection, BrokerError, DeliveryMode};
use crate::config::{Config, ConfigError};
use crate::connector::{ConnectError, Connector, ConnectorConfig};
use crate::event::{Event, EventError};
use crate::publisher::{FanoutPublisher, PublishError};
use crate::queue::{FanoutTargets, QueueNameError, QueuePair};

/// One step of an event source.
#[derive(Debug, Clone)]
pub enum Emission {
    /// Publish this event.
    Event(Event),
    /// Nothing to publish this step; the inter-event pause still applies.
    Idle,
}

/// Pluggable domain event generation.
///
/// The pipeline only needs to know where events go and how to describe
/// them; what they contain is entirely up to the source.
pub trait EventSource {
    /// Domain name; also the primary queue name.
    fn domain(&self) -> &str;

    /// Prefix for console lines, e.g. `Order Service`.
    fn service_name(&self) -> &str;

    /// Pause between steps when configuration does not override it.
    fn default_delay(&self) -> Duration;

    /// Next step, or `None` once the source is exhausted.
    fn next_emission(&mut self) -> Option<Result<Emission, EventError>>;

    /// Human-readable confirmation for a published event.
    fn describe(&self, event: &Event) -> String;

    fn start_message(&self) -> String {
        "Publishing events...".to_string()
    }

    fn finish_message(&self) -> String {
        "All events sent!".to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid queue name: {0}")]
    QueueName(#[from] QueueNameError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Failed to generate event: {0}")]
    Event(#[from] EventError),

    #[error("Failed to close broker connection: {0}")]
    Close(#[source] BrokerError),
}

/// Runtime knobs for one producer run.
#[derive(Debug, Clone)]
pub struct ProducerSettings {
    pub connector: ConnectorConfig,
    pub delivery_mode: DeliveryMode,
    /// Overrides the source's default delay when set.
    pub event_delay: Option<Duration>,
}

impl ProducerSettings {
    pub fn new(connector: ConnectorConfig) -> Self {
        Self {
            connector,
            delivery_mode: DeliveryMode::Persistent,
            event_delay: None,
        }
    }

    pub fn with_delivery_mode(mut self, delivery_mode: DeliveryMode) -> Self {
        self.delivery_mode = delivery_mode;
        self
    }

    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = Some(delay);
        self
    }
}

impl From<&Config> for ProducerSettings {
    fn from(config: &Config) -> Self {
        Self {
            connector: config.connector_config(),
            delivery_mode: config.publisher.delivery_mode,
            event_delay: config.publisher.event_delay(),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub domain: String,
    pub connect_attempts: u32,
    pub published: usize,
}

pub struct Producer<S> {
    source: S,
    settings: ProducerSettings,
}

impl<S: EventSource> Producer<S> {
    pub fn new(source: S, settings: ProducerSettings) -> Self {
        Self { source, settings }
    }

    /// Run the pipeline to completion against `broker`.
    ///
    /// Any error ends the run immediately. Events published before the
    /// failure stay published and the connection is left to the broker's
    /// own timeout handling.
    pub async fn run<B: Broker>(mut self, broker: &B) -> Result<RunSummary, ProducerError> {
        let queues = QueuePair::for_domain(self.source.domain())?;

        let mut connector = Connector::new(self.settings.connector.clone());
        let connection = connector.establish(broker).await?;
        let connect_attempts = connector.state().attempts();

        let mut publisher = FanoutPublisher::new(FanoutTargets::from(queues))
            .with_delivery_mode(self.settings.delivery_mode);
        publisher.provision_primary(&connection).await?;

        let service = self.source.service_name().to_string();
        let delay = self
            .settings
            .event_delay
            .unwrap_or_else(|| self.source.default_delay());

        info!("[{}] {}", service, self.source.start_message());

        let mut published = 0;
        while let Some(emission) = self.source.next_emission() {
            if let Emission::Event(event) = emission? {
                let receipt = publisher.publish(&connection, event).await?;
                published += 1;
                info!(
                    domain = %self.source.domain(),
                    "[{}] {}",
                    service,
                    self.source.describe(&receipt.event)
                );
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        info!("[{}] {}", service, self.source.finish_message());

        connection.close().await.map_err(ProducerError::Close)?;

        Ok(RunSummary {
            domain: self.source.domain().to_string(),
            connect_attempts,
            published,
        })
    }
}
