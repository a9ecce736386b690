//! Producer loop: publish opaque tokens at randomized intervals.
//!
//! Each iteration:
//! 1. Generates a fresh [`Message`]
//! 2. Publishes it to the queue through the default exchange
//! 3. Logs the payload
//! 4. Sleeps a random number of seconds from the configured range
//!
//! Shutdown is observed before each publish and during the sleep, never in
//! the middle of a publish.

use std::fmt;

use tracing::{error, info};
use uuid::Uuid;

use crate::broker::{Broker, Session};
use crate::config::Settings;
use crate::connector::{self, ConnectPolicy};
use crate::delay::DelayRange;
use crate::error::Result;
use crate::report::{LoopExit, LoopReport};
use crate::shutdown::Shutdown;

/// An opaque token: a random UUID as 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message(String);

impl Message {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Publish until `limit` messages were sent, shutdown is requested, or a
/// publish fails.
///
/// With `limit = None` the loop only ends on shutdown or failure. A failed
/// publish is logged and returned; it is not retried.
pub async fn run<S: Session>(
    session: &S,
    queue: &str,
    limit: Option<u64>,
    delay: DelayRange,
    shutdown: &mut Shutdown,
) -> Result<LoopReport> {
    let mut sent = 0u64;

    loop {
        if limit.is_some_and(|limit| sent >= limit) {
            info!(queue = queue, sent = sent, "producer_limit_reached");
            return Ok(LoopReport::new(LoopExit::Completed, sent));
        }

        if shutdown.is_triggered() {
            info!(queue = queue, sent = sent, "producer_interrupted");
            return Ok(LoopReport::interrupted(sent));
        }

        let message = Message::generate();
        if let Err(e) = session.publish(queue, message.as_bytes()).await {
            error!(queue = queue, sent = sent, error = %e, "producer_loop_failed");
            return Err(e);
        }
        sent += 1;

        info!(queue = queue, message = %message, "message_sent");

        tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                info!(queue = queue, sent = sent, "producer_interrupted");
                return Ok(LoopReport::interrupted(sent));
            }
            _ = delay.sleep() => {}
        }
    }
}

/// Connect, run the producer loop, and close the session on every path.
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

    let result = run(&session, queue, settings.message_limit, settings.delay, shutdown).await;
    connector::close(session).await;

    result
}
