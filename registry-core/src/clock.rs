use chrono::{DateTime, Utc};

/// Supplies the registry core with the current time.
///
/// Everything in this crate that needs "now" takes it through a `Clock`
/// rather than calling `Utc::now()` directly, so tests can drive the
/// timing-sensitive properties (lease expiry, self-preservation, delta
/// retention) deterministically instead of sleeping real wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock, backed by the system time.
#[derive(Debug, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub mod test {
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::{DateTime, Duration, Utc};

    use super::Clock;

    /// A clock whose `now()` is the session's start time plus an explicit,
    /// test-controlled offset. `advance`/`set` let a test move time forward
    /// without sleeping.
    pub struct TestClock {
        base: DateTime<Utc>,
        offset_millis: AtomicI64,
    }

    impl TestClock {
        #[must_use]
        pub fn new() -> Self {
            Self {
                base: Utc::now(),
                offset_millis: AtomicI64::new(0),
            }
        }

        pub fn advance(&self, duration: Duration) {
            self.offset_millis
                .fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
        }

        pub fn set_offset(&self, duration: Duration) {
            self.offset_millis
                .store(duration.num_milliseconds(), Ordering::SeqCst);
        }
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            self.base + Duration::milliseconds(self.offset_millis.load(Ordering::SeqCst))
        }
    }
}
