//! qpair Consumer - processes messages from a RabbitMQ queue one at a time.
//!
//! Reads its settings from the environment, connects with retries, then
//! consumes with a prefetch of 1. Each delivery is logged, held for a random
//! `MIN_SLEEP..=MAX_SLEEP` seconds, and acknowledged.

use std::process::ExitCode;

use tracing::{error, info};

use qpair::{consumer, logging, shutdown, AmqpBroker, ConnectPolicy, Role, Settings};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();

    info!("consumer_starting");

    let settings = match Settings::from_env(Role::Consumer) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "config_invalid");
            return ExitCode::FAILURE;
        }
    };

    info!(
        broker_host = %settings.redacted_host(),
        queue = %settings.queue_name,
        min_sleep = settings.delay.min(),
        max_sleep = settings.delay.max(),
        "config_loaded"
    );

    let (trigger, mut shutdown) = shutdown::channel();
    tokio::spawn(shutdown::listen_for_signals(trigger));

    let code = match consumer::execute(
        &AmqpBroker,
        &settings,
        &ConnectPolicy::default(),
        &mut shutdown,
    )
    .await
    {
        Ok(report) => {
            info!(exit = ?report.exit, acked = report.processed, "consumer_finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "consumer_failed");
            ExitCode::FAILURE
        }
    };

    info!("consumer_stopped");
    code
}
