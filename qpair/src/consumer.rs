//! Consumer loop: take one delivery at a time, "process" it, acknowledge.
//!
//! The consumer registers with a prefetch of 1 and manual acknowledgment, so
//! the broker holds the next message back until the current one is acked.
//! Deliveries arrive as a stream rather than through a callback.

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::broker::{Broker, Delivery, Session};
use crate::config::Settings;
use crate::connector::{self, ConnectPolicy};
use crate::delay::DelayRange;
use crate::error::Result;
use crate::report::{LoopExit, LoopReport};
use crate::shutdown::Shutdown;

/// Consumer tag announced to the broker.
pub const CONSUMER_TAG: &str = "qpair-consumer";

/// Unacknowledged deliveries the broker may hand us at once.
pub const PREFETCH_COUNT: u16 = 1;

/// Consume until shutdown, the broker ends the stream, or an error occurs.
///
/// Shutdown is only observed while waiting for the next delivery; a delivery
/// already taken is always processed and acknowledged first.
pub async fn run<S: Session>(
    session: &S,
    queue: &str,
    delay: DelayRange,
    shutdown: &mut Shutdown,
) -> Result<LoopReport> {
    let mut deliveries = match session.consume(queue, CONSUMER_TAG, PREFETCH_COUNT).await {
        Ok(deliveries) => deliveries,
        Err(e) => {
            error!(queue = queue, error = %e, "consumer_loop_failed");
            return Err(e);
        }
    };

    info!(queue = queue, "consumer_ready");

    let mut acked = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                info!(queue = queue, acked = acked, "consumer_interrupted");
                return Ok(LoopReport::interrupted(acked));
            }
            next = deliveries.next() => next,
        };

        match next {
            Some(Ok(delivery)) => {
                if let Err(e) = process(session, queue, &delivery, delay).await {
                    error!(
                        queue = queue,
                        delivery_tag = delivery.tag,
                        error = %e,
                        "consumer_loop_failed"
                    );
                    return Err(e);
                }
                acked += 1;
            }
            Some(Err(e)) => {
                error!(queue = queue, acked = acked, error = %e, "consumer_loop_failed");
                return Err(e);
            }
            None => {
                warn!(queue = queue, acked = acked, "rabbitmq_consumer_closed");
                return Ok(LoopReport::new(LoopExit::StreamEnded, acked));
            }
        }
    }
}

/// Log, sleep, then ack a single delivery.
async fn process<S: Session>(
    session: &S,
    queue: &str,
    delivery: &Delivery,
    delay: DelayRange,
) -> Result<()> {
    info!(
        queue = queue,
        delivery_tag = delivery.tag,
        message = %delivery.body_lossy(),
        "message_received"
    );

    let slept = delay.sleep().await;

    session.ack(delivery.tag).await?;

    debug!(
        delivery_tag = delivery.tag,
        processing_secs = slept.as_secs(),
        "message_acked"
    );

    Ok(())
}

/// Connect, run the consumer loop, and close the session on every path.
pub async fn execute<B: Broker>(
    broker: &B,
    settings: &Settings,
    policy: &ConnectPolicy,
    shutdown: &mut Shutdown,
) -> Result<LoopReport> {
    let url = settings.amqp_url()?;
    let queue = settings.queue_name.as_str();

    let Some(session) =
        connector::connect_or_shutdown(broker, &url, queue, policy, shutdown).await?
    else {
        return Ok(LoopReport::interrupted(0));
    };

    let result = run(&session, queue, settings.delay, shutdown).await;
    connector::close(session).await;

    result
}
