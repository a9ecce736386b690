//! How a producer or consumer loop ended.

/// Why a loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The producer sent its configured number of messages.
    Completed,
    /// Shutdown was requested.
    Interrupted,
    /// The broker ended the delivery stream.
    StreamEnded,
}

/// Outcome of a loop that finished cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    pub exit: LoopExit,
    /// Messages published (producer) or acknowledged (consumer)
    pub processed: u64,
}

impl LoopReport {
    pub fn new(exit: LoopExit, processed: u64) -> Self {
        Self { exit, processed }
    }

    pub fn interrupted(processed: u64) -> Self {
        Self::new(LoopExit::Interrupted, processed)
    }
}
