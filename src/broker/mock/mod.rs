//! Mock broker implementation for testing.
//!
//! Keeps queues and published messages in memory and records every
//! operation in order, so tests can assert on what reached the broker and
//! in which sequence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Broker, BrokerConnection, BrokerError, DeliveryMode, Result};
use crate::config::BrokerEndpoint;
use crate::queue::QueueName;

/// A message as stored by the mock broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub queue: String,
    pub body: Vec<u8>,
    pub delivery_mode: DeliveryMode,
}

/// Operation observed by the mock broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerOp {
    Connect,
    Declare(String),
    Publish(String),
    Close,
}

#[derive(Debug, Default)]
struct MockState {
    connect_attempts: AtomicU32,
    failures_remaining: AtomicU32,
    fail_on_publish: AtomicBool,
    /// Queue name -> durable flag.
    queues: Mutex<HashMap<String, bool>>,
    published: Mutex<Vec<PublishedMessage>>,
    ops: Mutex<Vec<BrokerOp>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockState {
    fn record(&self, op: BrokerOp) {
        lock(&self.ops).push(op);
    }
}

/// Mock broker for testing.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MockBroker {
    state: Arc<MockState>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` connection attempts fail as unreachable.
    pub fn fail_next_connects(&self, count: u32) {
        self.state.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Make every publish on existing and future connections fail.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Create a queue up front, as if another client had declared it.
    pub fn preexisting_queue(&self, name: &str, durable: bool) {
        lock(&self.state.queues).insert(name.to_string(), durable);
    }

    pub fn connect_attempts(&self) -> u32 {
        self.state.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn is_durable(&self, queue: &str) -> Option<bool> {
        lock(&self.state.queues).get(queue).copied()
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.state.published).clone()
    }

    /// Messages published to `queue`, in arrival order.
    pub fn messages_on(&self, queue: &str) -> Vec<PublishedMessage> {
        lock(&self.state.published)
            .iter()
            .filter(|m| m.queue == queue)
            .cloned()
            .collect()
    }

    pub fn ops(&self) -> Vec<BrokerOp> {
        lock(&self.state.ops).clone()
    }
}

#[async_trait]
impl Broker for MockBroker {
    type Connection = MockConnection;

    async fn connect(&self, endpoint: &BrokerEndpoint) -> Result<MockConnection> {
        self.state.connect_attempts.fetch_add(1, Ordering::SeqCst);
        endpoint.validate()?;

        let failing = self
            .state
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BrokerError::Connection(format!(
                "Mock broker at {} unreachable",
                endpoint.address()
            )));
        }

        self.state.record(BrokerOp::Connect);
        Ok(MockConnection {
            state: Arc::clone(&self.state),
            open: AtomicBool::new(true),
        })
    }
}

/// Connection handed out by `MockBroker`.
#[derive(Debug)]
pub struct MockConnection {
    state: Arc<MockState>,
    open: AtomicBool,
}

impl MockConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::Closed("Mock connection already closed".to_string()))
        }
    }
}

#[async_trait]
impl BrokerConnection for MockConnection {
    async fn declare_durable_queue(&self, queue: &QueueName) -> Result<()> {
        self.ensure_open()?;
        self.state.record(BrokerOp::Declare(queue.to_string()));

        let mut queues = lock(&self.state.queues);
        match queues.get(queue.as_str()) {
            Some(true) => Ok(()),
            Some(false) => Err(BrokerError::QueueConflict {
                queue: queue.to_string(),
                message: "inequivalent arg 'durable': received 'true' but current is 'false'"
                    .to_string(),
            }),
            None => {
                queues.insert(queue.to_string(), true);
                Ok(())
            }
        }
    }

    async fn publish(&self, queue: &QueueName, body: &[u8], mode: DeliveryMode) -> Result<()> {
        self.ensure_open()?;
        if self.state.fail_on_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Closed("Mock publish failure".to_string()));
        }

        self.state.record(BrokerOp::Publish(queue.to_string()));
        lock(&self.state.published).push(PublishedMessage {
            queue: queue.to_string(),
            body: body.to_vec(),
            delivery_mode: mode,
        });
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.ensure_open()?;
        self.open.store(false, Ordering::SeqCst);
        self.state.record(BrokerOp::Close);
        Ok(())
    }
}
