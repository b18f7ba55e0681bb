use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Sliding one-minute counter of successful renewals (spec §2, §4.8).
///
/// Tracks two adjacent one-minute buckets: `current` accumulates renewals as
/// they happen, `last` holds the count from the bucket immediately before.
/// `last_minute_rate` always reports `last` — the most recently *completed*
/// minute — which is what the self-preservation predicate compares against
/// the threshold.
pub struct RenewalRateMeter {
    current: AtomicI64,
    last: AtomicI64,
    bucket_start: Mutex<DateTime<Utc>>,
}

const BUCKET: chrono::Duration = chrono::Duration::seconds(60);

impl RenewalRateMeter {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current: AtomicI64::new(0),
            last: AtomicI64::new(0),
            bucket_start: Mutex::new(now),
        }
    }

    fn roll_if_needed(&self, now: DateTime<Utc>) {
        let mut bucket_start = self.bucket_start.lock();
        if now - *bucket_start >= BUCKET {
            // One tick may have to roll over multiple stale minutes (e.g.
            // after a long pause); anything beyond the minute just elapsed
            // is zero renewals, so `last` only ever reflects the bucket
            // immediately preceding `now`.
            let elapsed_minutes = (now - *bucket_start).num_seconds() / BUCKET.num_seconds();
            if elapsed_minutes == 1 {
                self.last.store(self.current.swap(0, Ordering::SeqCst), Ordering::SeqCst);
            } else {
                self.last.store(0, Ordering::SeqCst);
                self.current.store(0, Ordering::SeqCst);
            }
            *bucket_start = now;
        }
    }

    pub fn increment(&self, now: DateTime<Utc>) {
        self.roll_if_needed(now);
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn last_minute_rate(&self, now: DateTime<Utc>) -> i64 {
        self.roll_if_needed(now);
        self.last.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_reflects_the_prior_completed_minute() {
        let t0 = Utc::now();
        let meter = RenewalRateMeter::new(t0);
        for _ in 0..5 {
            meter.increment(t0);
        }
        assert_eq!(meter.last_minute_rate(t0), 0);

        let t1 = t0 + chrono::Duration::seconds(61);
        assert_eq!(meter.last_minute_rate(t1), 5);

        meter.increment(t1);
        meter.increment(t1);
        assert_eq!(meter.last_minute_rate(t1), 5);
    }

    #[test]
    fn a_long_gap_zeroes_the_rate() {
        let t0 = Utc::now();
        let meter = RenewalRateMeter::new(t0);
        meter.increment(t0);

        let much_later = t0 + chrono::Duration::seconds(600);
        assert_eq!(meter.last_minute_rate(much_later), 0);
    }
}
