//! Low-stock alerts.
//!
//! Each check samples a stock level; only levels under the threshold
//! produce an alert. Checks without an alert still count as a step, so the
//! pause between checks is kept.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::pick;
use crate::event::{Event, EventError};
use crate::producer::{Emission, EventSource};

const ITEMS: &[&str] = &["Leche", "Café molido", "Azúcar", "Tazas"];
const CHECK_COUNT: u32 = 5;
const MAX_STOCK: u32 = 10;

/// Stock level below which an alert is raised.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryAlert {
    #[serde(rename = "type")]
    pub kind: String,
    pub item: String,
    pub stock_level: u32,
    pub threshold: u32,
}

impl InventoryAlert {
    pub fn low_stock(item: &str, stock_level: u32) -> Self {
        Self {
            kind: "inventory_alert".to_string(),
            item: item.to_string(),
            stock_level,
            threshold: LOW_STOCK_THRESHOLD,
        }
    }
}

/// Publishes alerts to the `alerts` queue.
pub struct InventorySource<R = StdRng> {
    rng: R,
    checks: u32,
}

impl InventorySource<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for InventorySource<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> InventorySource<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng, checks: 0 }
    }
}

impl<R: Rng> EventSource for InventorySource<R> {
    fn domain(&self) -> &str {
        "alerts"
    }

    fn service_name(&self) -> &str {
        "Inventory Service"
    }

    fn default_delay(&self) -> Duration {
        Duration::from_secs(2)
    }

    fn next_emission(&mut self) -> Option<Result<Emission, EventError>> {
        if self.checks >= CHECK_COUNT {
            return None;
        }
        self.checks += 1;

        let item = pick(&mut self.rng, ITEMS);
        let stock = self.rng.random_range(0..=MAX_STOCK);
        if stock >= LOW_STOCK_THRESHOLD {
            return Some(Ok(Emission::Idle));
        }
        let alert = InventoryAlert::low_stock(item, stock);
        Some(Event::from_record(&alert).map(Emission::Event))
    }

    fn describe(&self, event: &Event) -> String {
        format!(
            "Stock bajo: {} ({} unidades)",
            event.get_str("item").unwrap_or_default(),
            event
                .get("stock_level")
                .map(ToString::to_string)
                .unwrap_or_default()
        )
    }

    fn start_message(&self) -> String {
        "Checking inventory...".to_string()
    }

    fn finish_message(&self) -> String {
        "Inventory check completed!".to_string()
    }
}
