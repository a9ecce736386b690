//! Broker seam used by the connector and both loops.
//!
//! The loops only see [`Broker`] and [`Session`]. The AMQP implementation
//! lives in [`amqp`]; tests drive the loops with in-memory doubles.
//!
//! ```text
//! Broker::open ──► Session ──► publish / consume + ack ──► close
//! ```

pub mod amqp;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

pub use amqp::{AmqpBroker, AmqpSession};

/// Broker-issued tag identifying one unacknowledged delivery.
pub type DeliveryTag = u64;

/// A message handed to the consumer, not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub body: Vec<u8>,
}

impl Delivery {
    pub fn new(tag: DeliveryTag, body: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            body: body.into(),
        }
    }

    /// Payload for logging. Invalid UTF-8 is replaced, never rejected.
    pub fn body_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Lazy sequence of deliveries for one consumer registration.
pub type Deliveries = BoxStream<'static, Result<Delivery>>;

/// Something that can open a session against a named queue.
#[async_trait]
pub trait Broker: Send + Sync {
    type Session: Session;

    /// Open a connection and channel, then declare `queue`.
    ///
    /// Failures to reach the broker must be reported as
    /// [`Error::Connection`](crate::Error::Connection) so the connector
    /// retries them. Declaration is idempotent.
    async fn open(&self, url: &str, queue: &str) -> Result<Self::Session>;
}

/// An open channel with its queue declared.
#[async_trait]
pub trait Session: Send + Sync + Sized {
    /// Publish `payload` to `queue` through the default exchange.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()>;

    /// Register as a manual-ack consumer on `queue` with the given prefetch.
    async fn consume(&self, queue: &str, consumer_tag: &str, prefetch: u16) -> Result<Deliveries>;

    /// Acknowledge one delivery.
    async fn ack(&self, tag: DeliveryTag) -> Result<()>;

    /// Close the channel and the connection.
    async fn close(self) -> Result<()>;
}
