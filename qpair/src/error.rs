//! Error type shared by the connector, the loops and configuration loading.

use thiserror::Error;

/// Every failure the producer and consumer can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// A required environment variable is absent or blank.
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    /// An environment variable could not be coerced to its type.
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },

    /// Delay bounds where the minimum exceeds the maximum.
    #[error("invalid delay range: min {min} is greater than max {max}")]
    InvalidDelayRange { min: u64, max: u64 },

    /// The broker host does not form a usable AMQP URL.
    #[error("invalid broker host {host:?}: {reason}")]
    InvalidHost { host: String, reason: String },

    /// The broker could not be reached. Retried by the connector.
    #[error("broker unreachable: {0:#}")]
    Connection(anyhow::Error),

    /// Every connection attempt failed.
    #[error("unable to connect to broker after {attempts} attempts")]
    ConnectionExhausted { attempts: u32 },

    /// A broker operation failed after the connection was established.
    #[error("broker operation failed: {0:#}")]
    Operation(#[from] anyhow::Error),
}

impl Error {
    /// Whether this error comes from settings validation.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::MissingVar(_)
                | Error::InvalidVar { .. }
                | Error::InvalidDelayRange { .. }
                | Error::InvalidHost { .. }
        )
    }

    /// Whether the connector should try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
