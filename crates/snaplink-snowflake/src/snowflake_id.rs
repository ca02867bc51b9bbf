use crate::error::Error;
use jiff::{SignedDuration, Timestamp};
use modular_bitfield::prelude::*;
use std::fmt;

pub const TIMESTAMP_BITS: u32 = 41;
pub const MACHINE_ID_BITS: u32 = 10;
pub const SEQUENCE_BITS: u32 = 12;

pub const MAX_TIMESTAMP_MILLIS: u64 = (1_u64 << TIMESTAMP_BITS) - 1;
pub const MAX_MACHINE_ID: u16 = (1_u16 << MACHINE_ID_BITS) - 1;
pub const MAX_SEQUENCE: u16 = (1_u16 << SEQUENCE_BITS) - 1;

const RESERVED_BIT: u64 = 1_u64 << 63;

// one reserved sign bit plus the three fields must fill the word exactly
const _: () = assert!(1 + TIMESTAMP_BITS + MACHINE_ID_BITS + SEQUENCE_BITS == u64::BITS);

/// A decoded Snowflake identifier.
///
/// Fields are declared least significant first, so the packed `u64` reads
/// high to low as `reserved | timestamp | machine_id | sequence`.
#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnowflakeId {
    /// 12 bits for the per-millisecond sequence.
    pub sequence: B12,
    /// 10 bits for the machine id (up to 1024 generators).
    pub machine_id: B10,
    /// 41 bits for milliseconds since the custom epoch.
    pub timestamp: B41,
    #[skip]
    __: B1,
}

impl SnowflakeId {
    /// Packs the three fields into an identifier.
    ///
    /// Returns `None` if any field does not fit its width.
    pub fn from_parts(timestamp: u64, machine_id: u16, sequence: u16) -> Option<Self> {
        if timestamp > MAX_TIMESTAMP_MILLIS || machine_id > MAX_MACHINE_ID || sequence > MAX_SEQUENCE
        {
            return None;
        }
        Some(
            SnowflakeId::new()
                .with_timestamp(timestamp)
                .with_machine_id(machine_id)
                .with_sequence(sequence),
        )
    }

    /// Returns the identifier as a plain integer.
    pub fn as_u64(&self) -> u64 {
        u64::from_le_bytes(self.into_bytes())
    }

    /// The absolute instant this identifier was generated at, given the epoch
    /// of the generator that produced it.
    pub fn generated_at(&self, epoch: Timestamp) -> Timestamp {
        epoch + SignedDuration::from_millis(self.timestamp() as i64)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.as_u64()
    }
}

impl TryFrom<u64> for SnowflakeId {
    type Error = Error;

    /// Decodes a raw identifier back into its fields.
    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        if raw & RESERVED_BIT != 0 {
            return Err(Error::ReservedBitSet(raw));
        }
        Ok(SnowflakeId::from_bytes(raw.to_le_bytes()))
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("timestamp", &self.timestamp())
            .field("machine_id", &self.machine_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}
