//! Delivery dispatches.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::{pick, CUSTOMERS};
use crate::event::{Event, EventError};
use crate::producer::{Emission, EventSource};

const ADDRESSES: &[&str] = &[
    "Calle 45 #12-34, Bogotá",
    "Carrera 7 #85-20, Medellín",
    "Avenida 68 #45-67, Cali",
    "Calle 100 #9-50, Barranquilla",
];
const STATUSES: &[&str] = &["pending", "in_transit", "out_for_delivery"];
const FIRST_DELIVERY: u32 = 2001;
const FIRST_ORDER: u32 = 101;
const DELIVERY_COUNT: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOrder {
    pub delivery_id: String,
    pub order_id: String,
    pub customer: String,
    pub address: String,
    pub status: String,
    pub estimated_time_minutes: u32,
}

pub struct DeliverySource<R = StdRng> {
    rng: R,
    created: u32,
}

impl DeliverySource<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for DeliverySource<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> DeliverySource<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng, created: 0 }
    }

    fn next_delivery(&mut self) -> DeliveryOrder {
        DeliveryOrder {
            delivery_id: format!("DEL-{}", FIRST_DELIVERY + self.created),
            order_id: format!("ORD-{}", FIRST_ORDER + self.created),
            customer: pick(&mut self.rng, CUSTOMERS).to_string(),
            address: pick(&mut self.rng, ADDRESSES).to_string(),
            status: pick(&mut self.rng, STATUSES).to_string(),
            estimated_time_minutes: self.rng.random_range(30..=120),
        }
    }
}

impl<R: Rng> EventSource for DeliverySource<R> {
    fn domain(&self) -> &str {
        "delivery"
    }

    fn service_name(&self) -> &str {
        "Delivery Service"
    }

    fn default_delay(&self) -> Duration {
        Duration::from_millis(1500)
    }

    fn next_emission(&mut self) -> Option<Result<Emission, EventError>> {
        if self.created >= DELIVERY_COUNT {
            return None;
        }
        let delivery = self.next_delivery();
        self.created += 1;
        Some(Event::from_record(&delivery).map(Emission::Event))
    }

    fn describe(&self, event: &Event) -> String {
        format!(
            "Envío creado: {} - {} - {} ({} min)",
            event.get_str("delivery_id").unwrap_or_default(),
            event.get_str("customer").unwrap_or_default(),
            event.get_str("status").unwrap_or_default(),
            event
                .get("estimated_time_minutes")
                .map(ToString::to_string)
                .unwrap_or_default()
        )
    }

    fn start_message(&self) -> String {
        "Creating delivery orders...".to_string()
    }

    fn finish_message(&self) -> String {
        "All delivery orders sent!".to_string()
    }
}
