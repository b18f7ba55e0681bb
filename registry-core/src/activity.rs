use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// One entry in a recent-activity ring (spec §4.11): a timestamped,
/// human-readable description such as `"A(1)"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub at: DateTime<Utc>,
    pub description: String,
}

/// Fixed-capacity FIFO used by the recent-registered/recent-cancelled rings.
/// `add` evicts the oldest entry once at capacity; `snapshot` returns
/// newest-first, matching the operator-view contract in spec §4.11.
pub struct ActivityRing {
    capacity: usize,
    entries: Mutex<VecDeque<ActivityRecord>>,
}

impl ActivityRing {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn add(&self, at: DateTime<Utc>, description: impl Into<String>) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(ActivityRecord {
            at,
            description: description.into(),
        });
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<ActivityRecord> {
        self.entries.lock().iter().rev().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_holds_exactly_capacity_after_overflow() {
        let ring = ActivityRing::new(3);
        let t0 = Utc::now();
        for i in 0..5 {
            ring.add(t0, format!("A({i})"));
        }
        let snapshot = ring.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].description, "A(4)");
        assert_eq!(snapshot[1].description, "A(3)");
        assert_eq!(snapshot[2].description, "A(2)");
    }
}
