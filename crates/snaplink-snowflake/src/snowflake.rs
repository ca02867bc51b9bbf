use crate::{
    clock::{Clock, SystemClock},
    error::{Error, Result},
    resolver::{AtomicSequenceResolver, Sequence, SequenceResolver},
    snowflake_id::{SnowflakeId, MAX_MACHINE_ID, MAX_SEQUENCE, MAX_TIMESTAMP_MILLIS},
};
use jiff::{SignedDuration, Timestamp};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Configures a Snowflake generator instance.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct SnowflakeSettings {
    /// A unique machine index in the range `[0, 1023]`.
    #[builder]
    pub machine_id: u16,
    /// Custom epoch used as the zero point for the 41-bit timestamp field.
    ///
    /// Must not be the Unix epoch itself, must not be in the future, and must
    /// be recent enough that `now - start_epoch` fits in 41 bits of
    /// milliseconds (roughly 69 years).
    #[builder]
    pub start_epoch: Timestamp,
}

/// Outcome of a single non-blocking generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Issued(SnowflakeId),
    /// The millisecond ran out of sequence numbers.
    Exhausted {
        /// First instant at which a new attempt can succeed.
        retry_at: Timestamp,
        /// Time left until `retry_at`, measured on the generator's clock.
        retry_after: Duration,
    },
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_millis: Option<u64>,
}

/// Snowflake ID generator.
///
/// One instance is meant to be created at startup and shared by reference
/// (typically behind an `Arc`) with every caller in the process.
pub struct Snowflake<C: Clock = SystemClock, R: SequenceResolver = AtomicSequenceResolver> {
    start_epoch: Timestamp,
    machine_id: u16,
    clock: C,
    resolver: R,
    state: Mutex<GeneratorState>,
}

impl Snowflake<SystemClock, AtomicSequenceResolver> {
    /// Creates a generator backed by the real system clock and the default
    /// atomic sequence resolver.
    pub fn new(settings: SnowflakeSettings) -> Result<Self> {
        Self::with_clock(settings, SystemClock, AtomicSequenceResolver::new())
    }
}

impl<R: SequenceResolver> Snowflake<SystemClock, R> {
    /// Creates a generator with a custom sequence resolver.
    pub fn with_resolver(settings: SnowflakeSettings, resolver: R) -> Result<Self> {
        Self::with_clock(settings, SystemClock, resolver)
    }
}

impl<C: Clock, R: SequenceResolver> Snowflake<C, R> {
    /// Creates a generator from all of its parts, validating the settings
    /// against the clock's current time.
    pub fn with_clock(settings: SnowflakeSettings, clock: C, resolver: R) -> Result<Self> {
        if settings.machine_id > MAX_MACHINE_ID {
            return Err(Error::InvalidMachineId {
                machine_id: settings.machine_id,
                max_machine_id: MAX_MACHINE_ID,
            });
        }

        if settings.start_epoch == Timestamp::UNIX_EPOCH {
            return Err(Error::ZeroEpoch);
        }

        let now = clock.now();
        if settings.start_epoch > now {
            return Err(Error::EpochAhead {
                epoch: settings.start_epoch,
                now,
            });
        }

        let elapsed = now.as_millisecond() - settings.start_epoch.as_millisecond();
        if elapsed as u64 > MAX_TIMESTAMP_MILLIS {
            return Err(Error::EpochTooOld {
                epoch: settings.start_epoch,
                max_millis: MAX_TIMESTAMP_MILLIS,
            });
        }

        Ok(Self {
            start_epoch: settings.start_epoch,
            machine_id: settings.machine_id,
            clock,
            resolver,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    pub fn machine_id(&self) -> u16 {
        self.machine_id
    }

    pub fn start_epoch(&self) -> Timestamp {
        self.start_epoch
    }

    /// Generates the next unique id.
    ///
    /// - if the millisecond's sequence is exhausted, wait for the next one
    /// - if the clock moved behind the last issued millisecond, fail with
    ///   [`Error::ClockMovedBackwards`] and leave retrying to the caller
    ///
    /// The wait blocks the calling thread. Async callers should loop on
    /// [`try_next_id`](Self::try_next_id) instead.
    pub fn next_id(&self) -> Result<SnowflakeId> {
        loop {
            match self.try_next_id()? {
                Attempt::Issued(id) => return Ok(id),
                Attempt::Exhausted { retry_at, .. } => self.clock.wait_until(retry_at),
            }
        }
    }

    /// Generates the next unique id, panicking if that is impossible.
    ///
    /// # Panics
    ///
    /// Panics when [`next_id`](Self::next_id) fails, e.g. after the clock
    /// moved backwards or the timestamp field overflowed.
    pub fn id(&self) -> SnowflakeId {
        match self.next_id() {
            Ok(id) => id,
            Err(e) => panic!("snowflake: failed to generate id: {e}"),
        }
    }

    /// Makes a single generation attempt without ever waiting.
    ///
    /// Returns [`Attempt::Exhausted`] when the current millisecond has no
    /// sequence numbers left; the caller decides how to wait for `retry_at`.
    pub fn try_next_id(&self) -> Result<Attempt> {
        let mut state = self.state.lock().map_err(|_| Error::StatePoisoned)?;

        let now = self.clock.now();
        let elapsed = now.as_millisecond() - self.start_epoch.as_millisecond();

        let floor = state.last_millis.map_or(0, |last| last as i64);
        if elapsed < floor {
            return Err(Error::ClockMovedBackwards {
                last: floor,
                now: elapsed,
            });
        }

        let elapsed = elapsed as u64;
        if elapsed > MAX_TIMESTAMP_MILLIS {
            return Err(Error::OverTimeLimit);
        }

        match self.resolver.resolve(elapsed)? {
            Sequence::Next(sequence) if sequence > MAX_SEQUENCE => Err(Error::SequenceOverflow {
                sequence,
                max_sequence: MAX_SEQUENCE,
            }),
            Sequence::Next(sequence) => {
                state.last_millis = Some(elapsed);
                Ok(Attempt::Issued(
                    SnowflakeId::new()
                        .with_timestamp(elapsed)
                        .with_machine_id(self.machine_id)
                        .with_sequence(sequence),
                ))
            }
            Sequence::Exhausted => {
                let retry_at =
                    self.start_epoch + SignedDuration::from_millis(elapsed as i64 + 1);
                let nanos = (retry_at.as_nanosecond() - now.as_nanosecond()).max(0);
                Ok(Attempt::Exhausted {
                    retry_at,
                    retry_after: Duration::from_nanos(nanos as u64),
                })
            }
        }
    }
}

impl<C: Clock, R: SequenceResolver> fmt::Debug for Snowflake<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snowflake")
            .field("start_epoch", &self.start_epoch)
            .field("machine_id", &self.machine_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_clock::TestClock;
    use std::collections::HashSet;
    use std::sync::Arc;

    // 2020-09-13T12:26:40Z
    const EPOCH_SECOND: i64 = 1_600_000_000;

    fn epoch() -> Timestamp {
        Timestamp::from_second(EPOCH_SECOND).unwrap()
    }

    fn at_millis(elapsed: i64) -> Timestamp {
        epoch() + SignedDuration::from_millis(elapsed)
    }

    fn settings(machine_id: u16) -> SnowflakeSettings {
        SnowflakeSettings::builder()
            .machine_id(machine_id)
            .start_epoch(epoch())
            .build()
    }

    fn make_generator(
        machine_id: u16,
        elapsed_millis: i64,
    ) -> (Snowflake<TestClock, AtomicSequenceResolver>, TestClock) {
        let clock = TestClock::new(at_millis(elapsed_millis));
        let generator =
            Snowflake::with_clock(settings(machine_id), clock.clone(), AtomicSequenceResolver::new())
                .unwrap();
        (generator, clock)
    }

    #[test]
    fn first_id_has_sequence_zero() {
        let (gen, _) = make_generator(0, 100);
        let id = gen.next_id().unwrap();
        assert_eq!(id.sequence(), 0);
    }

    #[test]
    fn same_millisecond_increments_sequence() {
        let (gen, _) = make_generator(0, 100);
        let id0 = gen.next_id().unwrap();
        let id1 = gen.next_id().unwrap();
        let id2 = gen.next_id().unwrap();
        assert_eq!(id0.sequence(), 0);
        assert_eq!(id1.sequence(), 1);
        assert_eq!(id2.sequence(), 2);
        assert!(id0.as_u64() < id1.as_u64() && id1.as_u64() < id2.as_u64());
    }

    #[test]
    fn sequence_exhaustion_waits_for_next_millisecond() {
        let (gen, clock) = make_generator(0, 100);
        for _ in 0..=MAX_SEQUENCE {
            gen.next_id().unwrap();
        }
        // the 4097th call has to move on to millisecond 101
        let id = gen.next_id().unwrap();
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), 101);
        assert_eq!(clock.now(), at_millis(101));
    }

    #[test]
    fn exhausted_attempt_reports_next_millisecond_without_waiting() {
        let (gen, clock) = make_generator(0, 100);
        for _ in 0..=MAX_SEQUENCE {
            assert!(matches!(gen.try_next_id().unwrap(), Attempt::Issued(_)));
        }

        assert_eq!(
            gen.try_next_id().unwrap(),
            Attempt::Exhausted {
                retry_at: at_millis(101),
                retry_after: Duration::from_millis(1),
            }
        );
        // the clock was not moved
        assert_eq!(clock.now(), at_millis(100));

        clock.advance(SignedDuration::from_millis(1));
        match gen.try_next_id().unwrap() {
            Attempt::Issued(id) => {
                assert_eq!(id.timestamp(), 101);
                assert_eq!(id.sequence(), 0);
            }
            other => panic!("expected an id, got {other:?}"),
        }
    }

    #[test]
    fn id_matches_next_id() {
        let (gen, _) = make_generator(9, 100);
        let first = gen.id();
        let second = gen.next_id().unwrap();
        assert_eq!(first.machine_id(), 9);
        assert_eq!(first.sequence(), 0);
        assert_eq!(second.sequence(), 1);
    }

    #[test]
    #[should_panic(expected = "clock moved backwards")]
    fn id_panics_when_clock_moves_backwards() {
        let (gen, clock) = make_generator(0, 100);
        gen.id();
        clock.set(at_millis(90));
        gen.id();
    }

    #[test]
    fn new_millisecond_resets_sequence() {
        let (gen, clock) = make_generator(0, 100);
        gen.next_id().unwrap();
        gen.next_id().unwrap();
        clock.advance(SignedDuration::from_millis(1));
        let id = gen.next_id().unwrap();
        assert_eq!(id.timestamp(), 101);
        assert_eq!(id.sequence(), 0);
    }

    #[test]
    fn machine_id_is_embedded() {
        let (gen, _) = make_generator(1023, 100);
        let id = gen.next_id().unwrap();
        assert_eq!(id.machine_id(), 1023);
    }

    #[test]
    fn timestamp_field_reflects_elapsed_millis() {
        let (gen, _) = make_generator(0, 5_000);
        let id = gen.next_id().unwrap();
        assert_eq!(id.timestamp(), 5_000);
        assert_eq!(id.generated_at(gen.start_epoch()), at_millis(5_000));
    }

    #[test]
    fn clock_moved_backwards_returns_error() {
        let (gen, clock) = make_generator(0, 100);
        gen.next_id().unwrap();
        clock.set(at_millis(90));
        assert_eq!(
            gen.next_id(),
            Err(Error::ClockMovedBackwards { last: 100, now: 90 })
        );
        assert!(gen.next_id().unwrap_err().is_retryable());

        // once the clock catches up, generation resumes
        clock.set(at_millis(100));
        let id = gen.next_id().unwrap();
        assert_eq!(id.timestamp(), 100);
        assert_eq!(id.sequence(), 1);
    }

    #[test]
    fn overtime_limit_returns_error() {
        let (gen, clock) = make_generator(0, 0);
        clock.set(at_millis(MAX_TIMESTAMP_MILLIS as i64 + 1));
        assert_eq!(gen.next_id(), Err(Error::OverTimeLimit));
    }

    #[test]
    fn constant_resolver_across_milliseconds_yields_distinct_ids() {
        let clock = TestClock::new(at_millis(100));
        let constant = |_millis: u64| -> Result<Sequence> { Ok(Sequence::Next(100)) };
        let gen = Snowflake::with_clock(settings(1), clock.clone(), constant).unwrap();

        let first = gen.next_id().unwrap();
        clock.advance(SignedDuration::from_millis(1));
        let second = gen.next_id().unwrap();

        assert_ne!(first, second);
        assert_eq!(first.sequence(), 100);
        assert_eq!(second.sequence(), 100);
        assert!(second.timestamp() > first.timestamp());
    }

    #[test]
    fn resolver_errors_propagate() {
        let clock = TestClock::new(at_millis(100));
        let failing =
            |_millis: u64| -> Result<Sequence> { Err(Error::Resolver("test error".to_string())) };
        let gen = Snowflake::with_clock(settings(0), clock, failing).unwrap();
        assert_eq!(
            gen.next_id(),
            Err(Error::Resolver("test error".to_string()))
        );
    }

    #[test]
    fn resolver_wider_than_sequence_field_is_rejected() {
        let clock = TestClock::new(at_millis(100));
        let too_wide = |_millis: u64| -> Result<Sequence> { Ok(Sequence::Next(MAX_SEQUENCE + 1)) };
        let gen = Snowflake::with_clock(settings(0), clock, too_wide).unwrap();
        assert_eq!(
            gen.next_id(),
            Err(Error::SequenceOverflow {
                sequence: MAX_SEQUENCE + 1,
                max_sequence: MAX_SEQUENCE,
            })
        );
    }

    #[test]
    fn invalid_machine_id_is_rejected() {
        let clock = TestClock::new(at_millis(100));
        let err =
            Snowflake::with_clock(settings(1024), clock, AtomicSequenceResolver::new()).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidMachineId {
                machine_id: 1024,
                max_machine_id: 1023,
            }
        );
    }

    #[test]
    fn zero_epoch_is_rejected() {
        let settings = SnowflakeSettings::builder()
            .machine_id(0)
            .start_epoch(Timestamp::UNIX_EPOCH)
            .build();
        assert_eq!(Snowflake::new(settings).unwrap_err(), Error::ZeroEpoch);
    }

    #[test]
    fn future_epoch_is_rejected() {
        let settings = SnowflakeSettings::builder()
            .machine_id(0)
            .start_epoch(Timestamp::now() + SignedDuration::from_hours(24))
            .build();
        assert!(matches!(
            Snowflake::new(settings),
            Err(Error::EpochAhead { .. })
        ));
    }

    #[test]
    fn epoch_beyond_timestamp_range_is_rejected() {
        // 1951-01-01, more than 2^41 ms before today
        let settings = SnowflakeSettings::builder()
            .machine_id(0)
            .start_epoch(Timestamp::from_second(-599_616_000).unwrap())
            .build();
        assert!(matches!(
            Snowflake::new(settings),
            Err(Error::EpochTooOld { .. })
        ));
    }

    #[test]
    fn decoding_reproduces_generated_fields() {
        let (gen, clock) = make_generator(321, 42);
        for step in 0..50 {
            if step % 10 == 0 {
                clock.advance(SignedDuration::from_millis(3));
            }
            let id = gen.next_id().unwrap();
            let decoded = SnowflakeId::try_from(u64::from(id)).unwrap();
            assert_eq!(decoded.timestamp(), id.timestamp());
            assert_eq!(decoded.machine_id(), 321);
            assert_eq!(decoded.sequence(), id.sequence());
        }
    }

    #[test]
    fn distinct_machines_never_collide_in_the_same_millisecond() {
        let (a, _) = make_generator(1, 100);
        let (b, _) = make_generator(2, 100);
        let from_a: HashSet<u64> = (0..100).map(|_| a.next_id().unwrap().as_u64()).collect();
        let from_b: HashSet<u64> = (0..100).map(|_| b.next_id().unwrap().as_u64()).collect();
        assert!(from_a.is_disjoint(&from_b));
    }

    #[test]
    fn concurrent_generation_is_unique() {
        const THREADS: usize = 16;
        const PER_THREAD: usize = 6_250;

        let settings = SnowflakeSettings::builder()
            .machine_id(7)
            .start_epoch(Timestamp::now() - SignedDuration::from_hours(24))
            .build();
        let gen = Arc::new(Snowflake::new(settings).unwrap());

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| gen.next_id().unwrap().as_u64())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::with_capacity(THREADS * PER_THREAD);
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 100_000);
    }

    #[test]
    fn concurrent_infallible_ids_are_unique() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 12_500;

        let settings = SnowflakeSettings::builder()
            .machine_id(1)
            .start_epoch(Timestamp::now() - SignedDuration::from_hours(24))
            .build();
        let gen = Arc::new(Snowflake::new(settings).unwrap());

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| gen.id().as_u64())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::with_capacity(THREADS * PER_THREAD);
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 100_000);
    }
}
