//! brewbus-billing: Billing event producer
//!
//! Connects to RabbitMQ, then publishes every generated event to the
//! primary queue and its `_monitor` twin.
//!
//! ## Configuration
//! - BREWBUS_CONFIG: Optional YAML config file
//! - BREWBUS__BROKER__HOST / PORT / USERNAME / PASSWORD: Broker endpoint
//! - BREWBUS_LOG: Log filter (default: info)

use std::process::ExitCode;

use brewbus::domains::BillingSource;
use brewbus::utils::bootstrap::{init_tracing, run_producer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    run_producer(BillingSource::new()).await
}
