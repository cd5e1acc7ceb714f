//! brewbus-order: Order event producer
//!
//! Publishes the fixed order list to `orders`, mirrored to
//! `orders_monitor` for the dashboard API.
//!
//! ## Configuration
//! - BREWBUS_CONFIG: Optional YAML config file
//! - BREWBUS__BROKER__HOST / PORT / USERNAME / PASSWORD: Broker endpoint
//! - BREWBUS_LOG: Log filter (default: info)

use std::process::ExitCode;

use brewbus::domains::OrderSource;
use brewbus::utils::bootstrap::{init_tracing, run_producer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    run_producer(OrderSource::new()).await
}
