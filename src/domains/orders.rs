//! Coffee orders.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

use crate::event::{Event, EventError};
use crate::producer::{Emission, EventSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub order_id: String,
    pub item: String,
    pub quantity: u32,
    pub user: String,
}

impl Order {
    pub fn new(order_id: &str, item: &str, quantity: u32, user: &str) -> Self {
        Self {
            order_id: order_id.to_string(),
            item: item.to_string(),
            quantity,
            user: user.to_string(),
        }
    }
}

/// Publishes a fixed list of orders to `orders`.
pub struct OrderSource {
    pending: VecDeque<Order>,
}

impl OrderSource {
    pub fn new() -> Self {
        Self::with_orders(vec![
            Order::new("ORD-101", "Capuchino", 1, "Laura"),
            Order::new("ORD-102", "Latte", 2, "Yeison"),
            Order::new("ORD-103", "Espresso doble", 1, "Santiago"),
        ])
    }

    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            pending: orders.into(),
        }
    }
}

impl Default for OrderSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for OrderSource {
    fn domain(&self) -> &str {
        "orders"
    }

    fn service_name(&self) -> &str {
        "Order Service"
    }

    fn default_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn next_emission(&mut self) -> Option<Result<Emission, EventError>> {
        let order = self.pending.pop_front()?;
        Some(Event::from_record(&order).map(Emission::Event))
    }

    fn describe(&self, event: &Event) -> String {
        format!(
            "Pedido enviado: {} ({})",
            event.get_str("order_id").unwrap_or_default(),
            event.get_str("item").unwrap_or_default()
        )
    }

    fn start_message(&self) -> String {
        "Sending orders...".to_string()
    }

    fn finish_message(&self) -> String {
        "All orders sent!".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut OrderSource) -> Vec<Event> {
        std::iter::from_fn(|| source.next_emission())
            .map(|e| match e.unwrap() {
                Emission::Event(event) => event,
                Emission::Idle => panic!("order source never idles"),
            })
            .collect()
    }

    #[test]
    fn test_default_orders() {
        let events = drain(&mut OrderSource::new());
        let ids: Vec<&str> = events.iter().filter_map(|e| e.get_str("order_id")).collect();
        assert_eq!(ids, vec!["ORD-101", "ORD-102", "ORD-103"]);
    }

    #[test]
    fn test_order_field_order_and_no_timestamp() {
        let events = drain(&mut OrderSource::new());
        let keys: Vec<&str> = events[1].fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["order_id", "item", "quantity", "user"]);
        assert!(events[1].timestamp().is_none());
    }

    #[test]
    fn test_describe() {
        let source = OrderSource::new();
        let event = Event::from_record(&Order::new("ORD-102", "Latte", 2, "Yeison")).unwrap();
        assert_eq!(source.describe(&event), "Pedido enviado: ORD-102 (Latte)");
    }
}
