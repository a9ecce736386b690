//! qpair - randomized RabbitMQ producer/consumer pair.
//!
//! This library provides shared modules for the two qpair binaries:
//! - `qpair-producer`: publishes opaque tokens at random intervals
//! - `qpair-consumer`: consumes one message at a time and acks after a random delay
//!
//! ## Flow
//!
//! ```text
//! Settings → connect (10 × 5s retries) → producer / consumer loop → close
//! ```

pub mod broker;
pub mod config;
pub mod connector;
pub mod consumer;
pub mod delay;
pub mod error;
pub mod logging;
pub mod producer;
pub mod report;
pub mod shutdown;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use broker::{AmqpBroker, Broker, Delivery, Session};
pub use config::{Role, Settings};
pub use connector::{connect, ConnectPolicy};
pub use delay::{random_sleep, DelayRange};
pub use error::{Error, Result};
pub use producer::Message;
pub use report::{LoopExit, LoopReport};
pub use shutdown::{Shutdown, ShutdownTrigger};
