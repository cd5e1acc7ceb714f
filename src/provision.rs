//! Durable queue provisioning.

use std::collections::HashSet;

use tracing::info;

use crate::broker::{BrokerConnection, BrokerError};
use crate::queue::QueueName;

/// Declares queues durable before first use.
///
/// Holding a connection means the connector reached `Connected`, so the
/// provisioner never runs ahead of it. Each queue is declared at most once
/// per provisioner; later calls for the same queue return immediately.
#[derive(Debug, Default)]
pub struct QueueProvisioner {
    declared: HashSet<QueueName>,
}

impl QueueProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ensure<C: BrokerConnection>(
        &mut self,
        connection: &C,
        queue: &QueueName,
    ) -> Result<(), BrokerError> {
        if self.declared.contains(queue) {
            return Ok(());
        }

        connection.declare_durable_queue(queue).await?;
        info!(queue = %queue, "Declared durable queue");
        self.declared.insert(queue.clone());
        Ok(())
    }

    pub fn is_declared(&self, queue: &QueueName) -> bool {
        self.declared.contains(queue)
    }
}
