//! Connect-with-retry against a broker that may still be starting.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::broker::{Broker, Session};
use crate::error::{Error, Result};
use crate::shutdown::Shutdown;

/// How many times to try connecting, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Open a session on `queue`, retrying connection failures.
///
/// Only [`Error::Connection`] is retried; any other failure is returned as
/// is. After `policy.max_attempts` consecutive connection failures this
/// returns [`Error::ConnectionExhausted`].
pub async fn connect<B: Broker>(
    broker: &B,
    url: &str,
    queue: &str,
    policy: &ConnectPolicy,
) -> Result<B::Session> {
    for attempt in 1..=policy.max_attempts {
        match broker.open(url, queue).await {
            Ok(session) => {
                info!(attempt = attempt, queue = queue, "rabbitmq_connected");
                return Ok(session);
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "rabbitmq_unreachable"
                );
                if attempt < policy.max_attempts {
                    sleep(policy.retry_delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::ConnectionExhausted {
        attempts: policy.max_attempts,
    })
}

/// Like [`connect`], but gives up quietly once shutdown is requested.
///
/// Returns `Ok(None)` when interrupted before a session was opened.
pub async fn connect_or_shutdown<B: Broker>(
    broker: &B,
    url: &str,
    queue: &str,
    policy: &ConnectPolicy,
    shutdown: &mut Shutdown,
) -> Result<Option<B::Session>> {
    tokio::select! {
        biased;
        _ = shutdown.triggered() => {
            info!(queue = queue, "connect_interrupted");
            Ok(None)
        }
        session = connect(broker, url, queue, policy) => session.map(Some),
    }
}

/// Close a session, logging rather than returning a failure to close.
pub async fn close<S: Session>(session: S) {
    if let Err(e) = session.close().await {
        warn!(error = %e, "rabbitmq_close_failed");
    }
}
