//! AMQP/RabbitMQ broker integration tests using testcontainers.
//!
//! Run with: cargo test --test broker_amqp -- --ignored --nocapture
//!
//! These tests spin up RabbitMQ in a container using testcontainers-rs.
//! No manual RabbitMQ setup required, but Docker must be available.

use std::time::Duration;

use brewbus::broker::{AmqpBroker, Broker, BrokerConnection, BrokerError, DeliveryMode};
use brewbus::config::BrokerEndpoint;
use brewbus::connector::ConnectorConfig;
use brewbus::domains::{Order, OrderSource};
use brewbus::event::Event;
use brewbus::producer::{Producer, ProducerSettings};
use brewbus::queue::QueueName;
use lapin::options::{BasicGetOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties};
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    GenericImage, ImageExt,
};

/// Start RabbitMQ container.
///
/// Returns (container, endpoint) where endpoint points at the mapped port.
async fn start_rabbitmq() -> (testcontainers::ContainerAsync<GenericImage>, BrokerEndpoint) {
    let image = GenericImage::new("rabbitmq", "3-management")
        .with_exposed_port(5672.tcp())
        .with_wait_for(WaitFor::message_on_stdout("Server startup complete"));

    let container = image
        .with_startup_timeout(Duration::from_secs(60))
        .start()
        .await
        .expect("Failed to start rabbitmq container");

    // Brief delay to ensure RabbitMQ is fully ready
    tokio::time::sleep(Duration::from_secs(2)).await;

    let host_port = container
        .get_host_port_ipv4(5672)
        .await
        .expect("Failed to get mapped port");

    let host = container
        .get_host()
        .await
        .expect("Failed to get container host");

    let endpoint =
        BrokerEndpoint::new(host.to_string(), host_port).with_credentials("guest", "guest");

    println!("RabbitMQ available at: {}", endpoint.address());

    (container, endpoint)
}

/// Independent channel for inspecting queues.
async fn inspector(endpoint: &BrokerEndpoint) -> (Connection, Channel) {
    let url = format!(
        "amqp://{}:{}@{}",
        endpoint.username,
        endpoint.password,
        endpoint.address()
    );
    let conn = Connection::connect(&url, ConnectionProperties::default())
        .await
        .expect("Failed to connect inspector");
    let channel = conn.create_channel().await.expect("Failed to create channel");
    (conn, channel)
}

async fn drain(channel: &Channel, queue: &str) -> Vec<lapin::message::BasicGetMessage> {
    let mut messages = Vec::new();
    while let Some(message) = channel
        .basic_get(queue, BasicGetOptions { no_ack: true })
        .await
        .expect("basic_get failed")
    {
        messages.push(message);
    }
    messages
}

fn unique_queue(prefix: &str) -> QueueName {
    QueueName::new(format!("{}-{}", prefix, uuid::Uuid::new_v4())).unwrap()
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_order_producer_fans_out_to_rabbitmq() {
    let (_container, endpoint) = start_rabbitmq().await;

    let connector = ConnectorConfig::new(endpoint.clone()).with_retry_delay(Duration::from_millis(500));
    let settings = ProducerSettings::new(connector).with_event_delay(Duration::ZERO);
    let source = OrderSource::with_orders(vec![Order::new("ORD-101", "Latte", 2, "Yeison")]);

    let summary = Producer::new(source, settings)
        .run(&AmqpBroker::new())
        .await
        .expect("Producer run failed");
    assert_eq!(summary.published, 1);

    let (_conn, channel) = inspector(&endpoint).await;
    let primary = drain(&channel, "orders").await;
    let monitor = drain(&channel, "orders_monitor").await;

    assert_eq!(primary.len(), 1);
    assert_eq!(monitor.len(), 1);
    assert_eq!(primary[0].delivery.data, monitor[0].delivery.data);
    assert_eq!(*primary[0].delivery.properties.delivery_mode(), Some(2));
    assert_eq!(*monitor[0].delivery.properties.delivery_mode(), Some(2));

    let event = Event::decode(&primary[0].delivery.data).unwrap();
    assert_eq!(event.get_str("order_id"), Some("ORD-101"));
    assert!(event.timestamp().is_some());
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_redeclare_durable_queue_is_noop() {
    let (_container, endpoint) = start_rabbitmq().await;
    let queue = unique_queue("durable");

    let conn = AmqpBroker::new().connect(&endpoint).await.unwrap();
    conn.declare_durable_queue(&queue).await.unwrap();
    conn.declare_durable_queue(&queue).await.unwrap();
    conn.close().await.unwrap();
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_non_durable_queue_conflicts() {
    let (_container, endpoint) = start_rabbitmq().await;
    let queue = unique_queue("transient");

    let (_inspector_conn, channel) = inspector(&endpoint).await;
    channel
        .queue_declare(
            queue.as_str(),
            QueueDeclareOptions::default(),
            FieldTable::default(),
        )
        .await
        .unwrap();

    let conn = AmqpBroker::new().connect(&endpoint).await.unwrap();
    let result = conn.declare_durable_queue(&queue).await;

    assert!(matches!(result, Err(BrokerError::QueueConflict { .. })));
}

#[tokio::test]
#[ignore = "Requires Docker"]
async fn test_publisher_confirms_round_trip() {
    let (_container, endpoint) = start_rabbitmq().await;
    let queue = unique_queue("confirmed");

    let conn = AmqpBroker::new()
        .with_publisher_confirms(true)
        .connect(&endpoint)
        .await
        .unwrap();
    conn.declare_durable_queue(&queue).await.unwrap();
    conn.publish(&queue, br#"{"k":"v"}"#, DeliveryMode::Persistent)
        .await
        .unwrap();
    conn.close().await.unwrap();

    let (_inspector_conn, channel) = inspector(&endpoint).await;
    assert_eq!(drain(&channel, queue.as_str()).await.len(), 1);
}

#[tokio::test]
async fn test_unreachable_broker_is_transient() {
    // Nothing listens on port 1 on loopback.
    let result = AmqpBroker::new()
        .connect(&BrokerEndpoint::new("127.0.0.1", 1))
        .await;

    match result {
        Err(e) => assert!(e.is_transient(), "expected transient error, got {e}"),
        Ok(_) => panic!("connection to a closed port succeeded"),
    }
}
