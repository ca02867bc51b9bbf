//! Coordination-free 64-bit identifier generation.
//!
//! Identifiers are laid out high to low as one reserved bit, a 41-bit
//! millisecond timestamp relative to a configured epoch, a 10-bit machine id
//! and a 12-bit per-millisecond sequence.

mod clock;
pub mod error;
mod resolver;
mod snowflake;
mod snowflake_id;

pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};
pub use resolver::{AtomicSequenceResolver, Sequence, SequenceResolver};
pub use snowflake::{Attempt, Snowflake, SnowflakeSettings};
pub use snowflake_id::{
    SnowflakeId, MACHINE_ID_BITS, MAX_MACHINE_ID, MAX_SEQUENCE, MAX_TIMESTAMP_MILLIS,
    SEQUENCE_BITS, TIMESTAMP_BITS,
};
