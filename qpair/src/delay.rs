//! Randomized delays between publishes and while "processing" a delivery.

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::error::{Error, Result};

/// Inclusive range of whole seconds to wait, with `min <= max` guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: u64,
    max: u64,
}

impl DelayRange {
    /// Validate and build a range of seconds.
    pub fn new(min: u64, max: u64) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidDelayRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    /// Draw a duration uniformly from `[min, max]` seconds.
    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }

    /// Draw a duration using the given generator.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.min..=self.max))
    }

    /// Sleep for a sampled duration and return how long that was.
    pub async fn sleep(&self) -> Duration {
        // ThreadRng is not Send, so it must not live across the await
        let duration = self.sample();
        sleep(duration).await;
        duration
    }
}

/// Sleep for a random whole number of seconds in `[min, max]`.
pub async fn random_sleep(min: u64, max: u64) -> Result<Duration> {
    Ok(DelayRange::new(min, max)?.sleep().await)
}
