use crate::{Error, Generator};
use std::sync::atomic::{AtomicU64, Ordering};

/// A sequential identifier generator.
///
/// Produces `offset, offset + 1, ...` and is unique within a single
/// instance only. Handy for tests and single-process setups where
/// predictable short codes are useful.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
}

impl SeqGenerator {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    /// Creates a generator starting from a specific counter value.
    ///
    /// Useful for resuming from a known state or for handing disjoint ranges
    /// to different processes.
    pub fn with_offset(offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
        }
    }
}

impl Default for SeqGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> Result<u64, Error> {
        Ok(self.counter.fetch_add(1, Ordering::SeqCst))
    }
}
