use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use registry_types::InstanceInfo;

/// One recorded mutation (spec §3): the post-mutation instance snapshot plus
/// the time it was appended.
#[derive(Debug, Clone)]
pub struct ChangeLogEntry {
    pub instance: InstanceInfo,
    pub update_ts: DateTime<Utc>,
}

/// Append-only-at-the-tail, head-pruned log of recent mutations (spec §3,
/// §4.10). Every mutator appends exactly one entry (spec I5).
///
/// The log has no lock of its own beyond the `Mutex` needed to serialize
/// concurrent appends from mutators that are all holding the registry's
/// *read* lock simultaneously. Quiescence during a delta read comes from the
/// registry-level rwlock (see `registry::RegistryCore`), not from this type.
pub struct ChangeLog {
    entries: Mutex<VecDeque<ChangeLogEntry>>,
}

impl Default for ChangeLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeLog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn append(&self, instance: InstanceInfo, update_ts: DateTime<Utc>) {
        self.entries.lock().push_back(ChangeLogEntry { instance, update_ts });
    }

    /// Drops entries whose `update_ts < now - retention`, starting from the
    /// head and stopping at the first retained entry. Returns the number of
    /// entries dropped, for the pruner's log line.
    pub fn prune_older_than(&self, retention: Duration, now: DateTime<Utc>) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let cutoff = now - retention;
        let mut entries = self.entries.lock();
        let mut pruned = 0;
        while matches!(entries.front(), Some(entry) if entry.update_ts < cutoff) {
            entries.pop_front();
            pruned += 1;
        }
        pruned
    }

    /// Clones out every currently-retained entry, in append order. Callers
    /// on the delta-read path are expected to hold the registry's global
    /// write lock while calling this, so no mutator can be appending
    /// concurrently (spec §5).
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChangeLogEntry> {
        self.entries.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_types::InstanceStatus;

    #[test]
    fn prune_drops_only_entries_past_retention() {
        let log = ChangeLog::new();
        let t0 = Utc::now();
        log.append(InstanceInfo::new("A", "1", InstanceStatus::Up), t0);
        log.append(InstanceInfo::new("A", "1", InstanceStatus::Up), t0 + chrono::Duration::seconds(200));

        let pruned = log.prune_older_than(Duration::from_secs(180), t0 + chrono::Duration::seconds(200));
        assert_eq!(pruned, 1);
        assert_eq!(log.snapshot().len(), 1);
    }

    #[test]
    fn snapshot_preserves_append_order() {
        let log = ChangeLog::new();
        let t0 = Utc::now();
        log.append(InstanceInfo::new("A", "1", InstanceStatus::Up), t0);
        log.append(InstanceInfo::new("A", "1", InstanceStatus::Down), t0);

        let snapshot = log.snapshot();
        assert_eq!(snapshot[0].instance.status, InstanceStatus::Up);
        assert_eq!(snapshot[1].instance.status, InstanceStatus::Down);
    }
}
