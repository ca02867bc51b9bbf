use crate::error::Result;
use crate::snowflake_id::MAX_SEQUENCE;
use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of resolving the sequence for one millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    /// Use this value as the sequence field.
    Next(u16),
    /// The millisecond has no sequence values left; retry on the next one.
    Exhausted,
}

/// Produces the per-millisecond sequence value for the generator.
///
/// `millis` is the current time in milliseconds since the generator epoch.
/// Values above [`MAX_SEQUENCE`] are rejected by the generator.
pub trait SequenceResolver: Send + Sync {
    fn resolve(&self, millis: u64) -> Result<Sequence>;
}

impl<F> SequenceResolver for F
where
    F: Fn(u64) -> Result<Sequence> + Send + Sync,
{
    fn resolve(&self, millis: u64) -> Result<Sequence> {
        self(millis)
    }
}

const EMPTY: u64 = u64::MAX;
const SEQUENCE_SHIFT: u32 = 16;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_SHIFT) - 1;

/// Lock-free per-millisecond counter.
///
/// The last millisecond and its sequence share one atomic word so both are
/// swapped together. The counter restarts at zero on every new millisecond and
/// reports [`Sequence::Exhausted`] instead of wrapping past [`MAX_SEQUENCE`].
#[derive(Debug)]
pub struct AtomicSequenceResolver {
    state: AtomicU64,
}

impl AtomicSequenceResolver {
    pub fn new() -> Self {
        Self {
            state: AtomicU64::new(EMPTY),
        }
    }
}

impl Default for AtomicSequenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn pack(millis: u64, sequence: u16) -> u64 {
    (millis << SEQUENCE_SHIFT) | sequence as u64
}

fn unpack(state: u64) -> (u64, u16) {
    (state >> SEQUENCE_SHIFT, (state & SEQUENCE_MASK) as u16)
}

impl SequenceResolver for AtomicSequenceResolver {
    fn resolve(&self, millis: u64) -> Result<Sequence> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let sequence = if current == EMPTY {
                0
            } else {
                let (last_millis, last_sequence) = unpack(current);
                if last_millis > millis {
                    // a caller is behind the counter; let it wait for time to catch up
                    return Ok(Sequence::Exhausted);
                }
                if last_millis == millis {
                    if last_sequence >= MAX_SEQUENCE {
                        return Ok(Sequence::Exhausted);
                    }
                    last_sequence + 1
                } else {
                    0
                }
            };

            match self.state.compare_exchange_weak(
                current,
                pack(millis, sequence),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(Sequence::Next(sequence)),
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn starts_at_zero_and_increments_within_a_millisecond() {
        let resolver = AtomicSequenceResolver::new();
        assert_eq!(resolver.resolve(10).unwrap(), Sequence::Next(0));
        assert_eq!(resolver.resolve(10).unwrap(), Sequence::Next(1));
        assert_eq!(resolver.resolve(10).unwrap(), Sequence::Next(2));
    }

    #[test]
    fn resets_on_new_millisecond() {
        let resolver = AtomicSequenceResolver::new();
        resolver.resolve(10).unwrap();
        resolver.resolve(10).unwrap();
        assert_eq!(resolver.resolve(11).unwrap(), Sequence::Next(0));
    }

    #[test]
    fn reports_exhaustion_instead_of_wrapping() {
        let resolver = AtomicSequenceResolver::new();
        for expected in 0..=MAX_SEQUENCE {
            assert_eq!(resolver.resolve(7).unwrap(), Sequence::Next(expected));
        }
        assert_eq!(resolver.resolve(7).unwrap(), Sequence::Exhausted);
        assert_eq!(resolver.resolve(8).unwrap(), Sequence::Next(0));
    }

    #[test]
    fn older_millisecond_is_exhausted() {
        let resolver = AtomicSequenceResolver::new();
        resolver.resolve(20).unwrap();
        assert_eq!(resolver.resolve(19).unwrap(), Sequence::Exhausted);
    }

    #[test]
    fn concurrent_callers_never_share_a_sequence() {
        let resolver = Arc::new(AtomicSequenceResolver::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || {
                    (0..500)
                        .map(|_| match resolver.resolve(42).unwrap() {
                            Sequence::Next(seq) => seq,
                            Sequence::Exhausted => panic!("4000 values fit in one millisecond"),
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for seq in handle.join().unwrap() {
                assert!(seen.insert(seq), "sequence {seq} handed out twice");
            }
        }
        assert_eq!(seen.len(), 4_000);
    }

    #[test]
    fn closures_are_resolvers() {
        let constant = |_millis: u64| -> Result<Sequence> { Ok(Sequence::Next(100)) };
        assert_eq!(constant.resolve(1).unwrap(), Sequence::Next(100));
        assert_eq!(constant.resolve(2).unwrap(), Sequence::Next(100));
    }
}
