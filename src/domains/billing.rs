//! Invoices.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::{pick, round_cents, CUSTOMERS};
use crate::event::{Event, EventError};
use crate::producer::{Emission, EventSource};

const ITEMS: &[&str] = &["Capuchino", "Latte", "Espresso doble", "Mocha", "Americano"];
const FIRST_INVOICE: u32 = 1001;
const INVOICE_COUNT: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub customer: String,
    pub item: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total: f64,
    pub status: String,
}

/// Generates `INVOICE_COUNT` pending invoices with random line items.
pub struct BillingSource<R = StdRng> {
    rng: R,
    issued: u32,
}

impl BillingSource<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for BillingSource<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> BillingSource<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng, issued: 0 }
    }

    fn next_invoice(&mut self) -> Invoice {
        let invoice_id = format!("INV-{}", FIRST_INVOICE + self.issued);
        let customer = pick(&mut self.rng, CUSTOMERS);
        let item = pick(&mut self.rng, ITEMS);
        let quantity = self.rng.random_range(1..=3);
        let unit_price = self.rng.random_range(2.5..5.5);

        Invoice {
            invoice_id,
            customer: customer.to_string(),
            item: item.to_string(),
            quantity,
            unit_price: round_cents(unit_price),
            total: round_cents(f64::from(quantity) * unit_price),
            status: "pending".to_string(),
        }
    }
}

impl<R: Rng> EventSource for BillingSource<R> {
    fn domain(&self) -> &str {
        "billing"
    }

    fn service_name(&self) -> &str {
        "Billing Service"
    }

    fn default_delay(&self) -> Duration {
        Duration::from_millis(1500)
    }

    fn next_emission(&mut self) -> Option<Result<Emission, EventError>> {
        if self.issued >= INVOICE_COUNT {
            return None;
        }
        let invoice = self.next_invoice();
        self.issued += 1;
        Some(Event::from_record(&invoice).map(Emission::Event))
    }

    fn describe(&self, event: &Event) -> String {
        format!(
            "Factura generada: {} - {} - ${}",
            event.get_str("invoice_id").unwrap_or_default(),
            event.get_str("customer").unwrap_or_default(),
            event.get("total").map(ToString::to_string).unwrap_or_default()
        )
    }

    fn start_message(&self) -> String {
        "Generating invoices...".to_string()
    }

    fn finish_message(&self) -> String {
        "All invoices sent!".to_string()
    }
}
