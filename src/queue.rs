//! Queue naming and fan-out targets.
//!
//! Every domain publishes to a primary queue named after the domain and a
//! monitor queue carrying the same traffic: `<domain>` and `<domain>_monitor`.

use std::fmt;

/// Suffix appended to a primary queue name to form its monitor queue.
pub const MONITOR_SUFFIX: &str = "_monitor";

/// AMQP short-string limit for queue names.
pub const MAX_QUEUE_NAME_BYTES: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueNameError {
    #[error("Queue name must not be empty")]
    Empty,

    #[error("Queue name '{0}' exceeds {MAX_QUEUE_NAME_BYTES} bytes")]
    TooLong(String),
}

/// Validated queue name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueName(String);

impl QueueName {
    pub fn new(name: impl Into<String>) -> Result<Self, QueueNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(QueueNameError::Empty);
        }
        if name.len() > MAX_QUEUE_NAME_BYTES {
            return Err(QueueNameError::TooLong(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the monitor queue paired with this one.
    pub fn monitor(&self) -> Result<QueueName, QueueNameError> {
        QueueName::new(format!("{}{}", self.0, MONITOR_SUFFIX))
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueueName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Primary and monitor queue for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePair {
    pub primary: QueueName,
    pub monitor: QueueName,
}

impl QueuePair {
    pub fn for_domain(domain: &str) -> Result<Self, QueueNameError> {
        let primary = QueueName::new(domain)?;
        let monitor = primary.monitor()?;
        Ok(Self { primary, monitor })
    }
}

/// Ordered list of queues every event is published to.
///
/// Built from a `QueuePair` it is always `[primary, monitor]`, which fixes
/// the per-event publish order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutTargets(Vec<QueueName>);

impl FanoutTargets {
    pub fn iter(&self) -> impl Iterator<Item = &QueueName> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First target; receives each event before the others.
    pub fn primary(&self) -> &QueueName {
        &self.0[0]
    }
}

impl From<QueuePair> for FanoutTargets {
    fn from(pair: QueuePair) -> Self {
        Self(vec![pair.primary, pair.monitor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_for_domain() {
        let pair = QueuePair::for_domain("orders").unwrap();
        assert_eq!(pair.primary.as_str(), "orders");
        assert_eq!(pair.monitor.as_str(), "orders_monitor");
    }

    #[test]
    fn test_monitor_is_primary_plus_suffix() {
        for domain in ["orders", "billing", "delivery", "alerts"] {
            let pair = QueuePair::for_domain(domain).unwrap();
            assert_eq!(
                pair.monitor.as_str(),
                format!("{}{}", pair.primary, MONITOR_SUFFIX)
            );
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(QueueName::new(""), Err(QueueNameError::Empty));
        assert!(QueuePair::for_domain("").is_err());
    }

    #[test]
    fn test_monitor_name_respects_length_limit() {
        let name = "q".repeat(MAX_QUEUE_NAME_BYTES - 2);
        let primary = QueueName::new(name).unwrap();
        assert!(matches!(primary.monitor(), Err(QueueNameError::TooLong(_))));
    }

    #[test]
    fn test_fanout_targets_order() {
        let targets = FanoutTargets::from(QueuePair::for_domain("billing").unwrap());
        let names: Vec<&str> = targets.iter().map(QueueName::as_str).collect();
        assert_eq!(names, vec!["billing", "billing_monitor"]);
        assert_eq!(targets.primary().as_str(), "billing");
        assert_eq!(targets.len(), 2);
    }
}
