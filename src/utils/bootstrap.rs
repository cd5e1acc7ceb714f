//! Bootstrap utilities for brewbus binaries.
//!
//! Shared initialization code for all producer binaries.

use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;
#[cfg(feature = "amqp")]
use crate::config::Config;
use crate::producer::{ProducerError, RunSummary};
#[cfg(feature = "amqp")]
use crate::producer::{EventSource, Producer, ProducerSettings};

/// Initialize tracing with BREWBUS_LOG environment variable.
///
/// Defaults to "info" level if BREWBUS_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load configuration and run `source` against RabbitMQ.
///
/// Returns the process exit code: success after all events were published
/// and the connection closed, failure on any fatal error.
#[cfg(feature = "amqp")]
pub async fn run_producer<S: EventSource>(source: S) -> ExitCode {
    exit_code(&try_run_producer(source).await)
}

/// Map the outcome of a producer run to the process exit code.
pub fn exit_code(result: &Result<RunSummary, ProducerError>) -> ExitCode {
    match result {
        Ok(summary) => {
            tracing::info!(
                domain = %summary.domain,
                published = summary.published,
                connect_attempts = summary.connect_attempts,
                "Producer finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => exit_failure(e),
    }
}

#[cfg(feature = "amqp")]
async fn try_run_producer<S: EventSource>(source: S) -> Result<RunSummary, ProducerError> {
    use crate::broker::AmqpBroker;

    let config = Config::load(None)?;
    let broker = AmqpBroker::new().with_publisher_confirms(config.publisher.wait_for_confirms);
    Producer::new(source, ProducerSettings::from(&config))
        .run(&broker)
        .await
}

/// Log the final diagnostic and map it to the failure exit code.
pub fn exit_failure(error: &dyn std::error::Error) -> ExitCode {
    error!(error = %error, "Producer terminated");
    ExitCode::FAILURE
}
