//! brewbus-inventory: Inventory event producer
//!
//! Runs five stock checks and publishes an alert to `alerts` and
//! `alerts_monitor` for every item under the low-stock threshold.
//!
//! ## Configuration
//! - BREWBUS_CONFIG: Optional YAML config file
//! - BREWBUS__BROKER__HOST / PORT / USERNAME / PASSWORD: Broker endpoint
//! - BREWBUS_LOG: Log filter (default: info)

use std::process::ExitCode;

use brewbus::domains::InventorySource;
use brewbus::utils::bootstrap::{init_tracing, run_producer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    run_producer(InventorySource::new()).await
}
