//! qpair Producer - publishes opaque tokens to a RabbitMQ queue.
//!
//! Reads its settings from the environment, connects with retries, then
//! publishes `MSG_LIMIT` messages (or until interrupted) with a random
//! `MIN_SLEEP..=MAX_SLEEP` second pause after each one.

use std::process::ExitCode;

use tracing::{error, info};

use qpair::{logging, producer, shutdown, AmqpBroker, ConnectPolicy, Role, Settings};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();

    info!("producer_starting");

    let settings = match Settings::from_env(Role::Producer) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "config_invalid");
            return ExitCode::FAILURE;
        }
    };

    info!(
        broker_host = %settings.redacted_host(),
        queue = %settings.queue_name,
        message_limit = ?settings.message_limit,
        min_sleep = settings.delay.min(),
        max_sleep = settings.delay.max(),
        "config_loaded"
    );

    let (trigger, mut shutdown) = shutdown::channel();
    tokio::spawn(shutdown::listen_for_signals(trigger));

    let code = match producer::execute(
        &AmqpBroker,
        &settings,
        &ConnectPolicy::default(),
        &mut shutdown,
    )
    .await
    {
        Ok(report) => {
            info!(exit = ?report.exit, sent = report.processed, "producer_finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "producer_failed");
            ExitCode::FAILURE
        }
    };

    info!("producer_stopped");
    code
}
