use jiff::Timestamp;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by Snowflake configuration and ID generation.
///
/// Configuration errors (`InvalidMachineId`, `ZeroEpoch`, `EpochAhead`,
/// `EpochTooOld`) are only produced while constructing a generator. The rest
/// can surface from [`Snowflake::next_id`](crate::Snowflake::next_id).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid machine id {machine_id}; expected 0..={max_machine_id}")]
    InvalidMachineId { machine_id: u16, max_machine_id: u16 },
    #[error("the start epoch cannot be the zero instant")]
    ZeroEpoch,
    #[error("epoch is ahead of current clock time: epoch={epoch}, now={now}")]
    EpochAhead { epoch: Timestamp, now: Timestamp },
    #[error("epoch {epoch} is older than the {max_millis}ms timestamp range allows")]
    EpochTooOld { epoch: Timestamp, max_millis: u64 },
    #[error("clock moved backwards: last={last}ms, now={now}ms since epoch")]
    ClockMovedBackwards { last: i64, now: i64 },
    #[error("overtime limit")]
    OverTimeLimit,
    #[error("sequence resolver returned {sequence}; expected 0..={max_sequence}")]
    SequenceOverflow { sequence: u16, max_sequence: u16 },
    #[error("sequence resolver failed: {0}")]
    Resolver(String),
    #[error("identifier {0:#x} has the reserved bit set")]
    ReservedBitSet(u64),
    #[error("generator state lock is poisoned")]
    StatePoisoned,
}

impl Error {
    /// Whether the error is transient and the caller may retry after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ClockMovedBackwards { .. })
    }
}
