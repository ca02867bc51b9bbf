pub mod seq;

use snaplink_snowflake::{Attempt, Clock, SequenceResolver, Snowflake};
use std::time::Duration;

pub use snaplink_snowflake::Error;

/// Result of [`Generator::try_generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generated {
    Id(u64),
    /// Nothing can be issued right now; try again after the given delay.
    RetryAfter(Duration),
}

/// Trait for producing identifiers for new short links.
///
/// Implementations are pure generators that don't interact with storage.
/// Every identifier returned by one instance must be distinct, and distinct
/// instances deployed side by side must not overlap.
pub trait Generator: Send + Sync + 'static {
    /// Generates the next unique identifier, blocking if it has to wait.
    fn generate(&self) -> Result<u64, Error>;

    /// Makes one attempt that never blocks the calling thread.
    ///
    /// Generators that can run dry report how long to back off instead of
    /// sleeping, so async callers can wait on their own timer.
    fn try_generate(&self) -> Result<Generated, Error> {
        self.generate().map(Generated::Id)
    }
}

impl<C, R> Generator for Snowflake<C, R>
where
    C: Clock + 'static,
    R: SequenceResolver + 'static,
{
    fn generate(&self) -> Result<u64, Error> {
        self.next_id().map(u64::from)
    }

    fn try_generate(&self) -> Result<Generated, Error> {
        Ok(match self.try_next_id()? {
            Attempt::Issued(id) => Generated::Id(id.into()),
            Attempt::Exhausted { retry_after, .. } => Generated::RetryAfter(retry_after),
        })
    }
}

impl<G: Generator> Generator for std::sync::Arc<G> {
    fn generate(&self) -> Result<u64, Error> {
        (**self).generate()
    }

    fn try_generate(&self) -> Result<Generated, Error> {
        (**self).try_generate()
    }
}
