//! Fan-out publisher.
//!
//! Each event is stamped, encoded once, and the same bytes are published to
//! every fan-out target in order (primary first, then monitor). A failed
//! publish ends the fan-out; there is no reconnect or buffering here.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::broker::{BrokerConnection, BrokerError, DeliveryMode};
use crate::event::{Event, EventError};
use crate::provision::QueueProvisioner;
use crate::queue::FanoutTargets;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to encode event: {0}")]
    Event(#[from] EventError),

    #[error("Failed to provision queue: {0}")]
    Provision(#[source] BrokerError),

    #[error("Failed to publish event: {0}")]
    Broker(#[source] BrokerError),
}

/// What a successful fan-out delivered.
#[derive(Debug, Clone)]
pub struct FanoutReceipt {
    /// The event as stamped before encoding.
    pub event: Event,
    /// Bytes published to every target.
    pub body: Vec<u8>,
    /// Number of queues the body was published to.
    pub deliveries: usize,
}

pub struct FanoutPublisher {
    targets: FanoutTargets,
    delivery_mode: DeliveryMode,
    provisioner: QueueProvisioner,
}

impl FanoutPublisher {
    /// Publisher with persistent delivery.
    pub fn new(targets: FanoutTargets) -> Self {
        Self {
            targets,
            delivery_mode: DeliveryMode::Persistent,
            provisioner: QueueProvisioner::new(),
        }
    }

    pub fn with_delivery_mode(mut self, delivery_mode: DeliveryMode) -> Self {
        self.delivery_mode = delivery_mode;
        self
    }

    pub fn targets(&self) -> &FanoutTargets {
        &self.targets
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    /// Declare the primary queue. Called once when the producer starts;
    /// remaining targets are declared lazily before their first publish.
    pub async fn provision_primary<C: BrokerConnection>(
        &mut self,
        connection: &C,
    ) -> Result<(), PublishError> {
        self.provisioner
            .ensure(connection, self.targets.primary())
            .await
            .map_err(PublishError::Provision)
    }

    /// Stamp `event` with the current time and fan it out.
    pub async fn publish<C: BrokerConnection>(
        &mut self,
        connection: &C,
        event: Event,
    ) -> Result<FanoutReceipt, PublishError> {
        self.publish_at(connection, event, Utc::now()).await
    }

    /// Fan `event` out, stamping it with `now` if it carries no timestamp.
    pub async fn publish_at<C: BrokerConnection>(
        &mut self,
        connection: &C,
        mut event: Event,
        now: DateTime<Utc>,
    ) -> Result<FanoutReceipt, PublishError> {
        event.stamp(now);
        let body = event.encode()?;

        let mut deliveries = 0;
        for queue in self.targets.iter() {
            self.provisioner
                .ensure(connection, queue)
                .await
                .map_err(PublishError::Provision)?;
            connection
                .publish(queue, &body, self.delivery_mode)
                .await
                .map_err(PublishError::Broker)?;
            deliveries += 1;
            debug!(queue = %queue, bytes = body.len(), "Published event");
        }

        Ok(FanoutReceipt {
            event,
            body,
            deliveries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Broker, BrokerOp, MockBroker};
    use crate::config::BrokerEndpoint;
    use crate::queue::QueuePair;
    use chrono::TimeZone;

    fn publisher(domain: &str) -> FanoutPublisher {
        FanoutPublisher::new(FanoutTargets::from(QueuePair::for_domain(domain).unwrap()))
    }

    fn order() -> Event {
        Event::new()
            .with("order_id", "ORD-101")
            .with("item", "Latte")
            .with("quantity", 2)
            .with("user", "Yeison")
    }

    #[tokio::test]
    async fn test_publishes_identical_body_to_both_queues() {
        let broker = MockBroker::new();
        let conn = broker.connect(&BrokerEndpoint::default()).await.unwrap();
        let mut publisher = publisher("orders");
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

        let receipt = publisher.publish_at(&conn, order(), now).await.unwrap();

        let primary = broker.messages_on("orders");
        let monitor = broker.messages_on("orders_monitor");
        assert_eq!(primary.len(), 1);
        assert_eq!(monitor.len(), 1);
        assert_eq!(primary[0].body, monitor[0].body);
        assert_eq!(primary[0].body, receipt.body);
        assert_eq!(receipt.deliveries, 2);
        assert_eq!(
            String::from_utf8(receipt.body).unwrap(),
            r#"{"order_id":"ORD-101","item":"Latte","quantity":2,"user":"Yeison","timestamp":"2025-01-02T03:04:05Z"}"#
        );
    }

    #[tokio::test]
    async fn test_null_timestamp_is_stamped_before_publishing() {
        let broker = MockBroker::new();
        let conn = broker.connect(&BrokerEndpoint::default()).await.unwrap();
        let mut publisher = publisher("orders");
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let draft = Event::new()
            .with("order_id", "ORD-1")
            .with("timestamp", serde_json::Value::Null);

        let receipt = publisher.publish_at(&conn, draft, now).await.unwrap();

        assert_eq!(
            String::from_utf8(receipt.body).unwrap(),
            r#"{"order_id":"ORD-1","timestamp":"2025-01-02T03:04:05Z"}"#
        );
        let delivered = Event::decode(&broker.messages_on("orders_monitor")[0].body).unwrap();
        assert_eq!(delivered.timestamp(), Some("2025-01-02T03:04:05Z"));
    }

    #[tokio::test]
    async fn test_primary_before_monitor_and_lazy_monitor_declare() {
        let broker = MockBroker::new();
        let conn = broker.connect(&BrokerEndpoint::default()).await.unwrap();
        let mut publisher = publisher("billing");

        publisher.provision_primary(&conn).await.unwrap();
        publisher.publish(&conn, order()).await.unwrap();
        publisher.publish(&conn, order()).await.unwrap();

        assert_eq!(
            broker.ops(),
            vec![
                BrokerOp::Connect,
                BrokerOp::Declare("billing".into()),
                BrokerOp::Publish("billing".into()),
                BrokerOp::Declare("billing_monitor".into()),
                BrokerOp::Publish("billing_monitor".into()),
                BrokerOp::Publish("billing".into()),
                BrokerOp::Publish("billing_monitor".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_delivery_mode_is_explicit() {
        let broker = MockBroker::new();
        let conn = broker.connect(&BrokerEndpoint::default()).await.unwrap();
        let mut publisher = publisher("delivery").with_delivery_mode(DeliveryMode::Transient);

        publisher.publish(&conn, order()).await.unwrap();

        assert!(broker
            .published()
            .iter()
            .all(|m| m.delivery_mode == DeliveryMode::Transient));
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported() {
        let broker = MockBroker::new();
        let conn = broker.connect(&BrokerEndpoint::default()).await.unwrap();
        broker.set_fail_on_publish(true);
        let mut publisher = publisher("orders");

        let err = publisher.publish(&conn, order()).await.unwrap_err();

        assert!(matches!(err, PublishError::Broker(BrokerError::Closed(_))));
        assert!(broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_monitor_conflict_stops_after_primary() {
        let broker = MockBroker::new();
        broker.preexisting_queue("orders_monitor", false);
        let conn = broker.connect(&BrokerEndpoint::default()).await.unwrap();
        let mut publisher = publisher("orders");

        let err = publisher.publish(&conn, order()).await.unwrap_err();

        assert!(matches!(
            err,
            PublishError::Provision(BrokerError::QueueConflict { .. })
        ));
        assert_eq!(broker.messages_on("orders").len(), 1);
        assert!(broker.messages_on("orders_monitor").is_empty());
    }
}
