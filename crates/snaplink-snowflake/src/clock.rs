use jiff::Timestamp;
use std::time::Duration;

pub trait Clock: Send + Sync {
    /// Returns the current time of the clock
    fn now(&self) -> Timestamp;
    /// Block and wait until the clock reaches the target time.
    fn wait_until(&self, target: Timestamp);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn wait_until(&self, target: Timestamp) {
        // Re-check after every sleep; the OS may wake us early or late.
        loop {
            let now = Timestamp::now();
            if now >= target {
                return;
            }
            let remaining_ms = target.as_millisecond() - now.as_millisecond();
            if remaining_ms <= 0 {
                // Less than a millisecond left, sleeping would overshoot.
                std::thread::yield_now();
            } else {
                std::thread::sleep(Duration::from_millis(remaining_ms as u64));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use crate::clock::Clock;
    use jiff::{SignedDuration, Timestamp};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    pub(crate) struct TestClock {
        inner: Arc<Mutex<TestClockState>>,
    }

    struct TestClockState {
        now: Timestamp,
    }

    impl TestClock {
        pub(crate) fn new(now: Timestamp) -> Self {
            Self {
                inner: Arc::new(Mutex::new(TestClockState { now })),
            }
        }

        pub(crate) fn set(&self, now: Timestamp) {
            self.inner
                .lock()
                .expect("test clock lock should not be poisoned")
                .now = now;
        }

        pub(crate) fn advance(&self, by: SignedDuration) {
            let mut state = self
                .inner
                .lock()
                .expect("test clock lock should not be poisoned");
            state.now = state.now + by;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Timestamp {
            self.inner
                .lock()
                .expect("test clock lock should not be poisoned")
                .now
        }

        fn wait_until(&self, target: Timestamp) {
            let mut state = self
                .inner
                .lock()
                .expect("test clock lock should not be poisoned");
            // jump straight to the target, nothing needs to block in tests
            if target > state.now {
                state.now = target;
            }
        }
    }

    #[test]
    fn test_clock_works() {
        let base = Timestamp::from_millisecond(1_000).unwrap();
        let clock = TestClock::new(base);
        assert_eq!(clock.now(), base);

        let target = Timestamp::from_millisecond(1_005).unwrap();
        clock.wait_until(target);
        assert_eq!(clock.now(), target);

        // waiting for the past leaves the clock untouched
        clock.wait_until(base);
        assert_eq!(clock.now(), target);

        clock.advance(SignedDuration::from_millis(3));
        assert_eq!(clock.now().as_millisecond(), 1_008);

        clock.set(base);
        assert_eq!(clock.now(), base);
    }
}
