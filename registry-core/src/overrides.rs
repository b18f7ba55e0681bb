use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use registry_types::InstanceStatus;

struct Entry {
    status: InstanceStatus,
    accessed_at: DateTime<Utc>,
}

/// Time-expiring `id -> status` map of operator-imposed overrides (spec §3,
/// §9). Expiry is lazy: an entry is only dropped when touched past its TTL,
/// and every successful `get` bumps `accessed_at` — the "access-bump-on-read"
/// behavior spec §9 calls out as load-bearing for any replacement design.
pub struct OverridesMap {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl OverridesMap {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn is_live(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(self.ttl) else {
            return true;
        };
        now <= entry.accessed_at + ttl
    }

    /// Inserts only if no live entry exists for `id`. Used by `register` to
    /// seed an override from a freshly (re-)registering instance.
    pub fn insert_if_absent(&self, id: &str, status: InstanceStatus, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(id) {
            if self.is_live(existing, now) {
                return false;
            }
        }
        entries.insert(
            id.to_string(),
            Entry {
                status,
                accessed_at: now,
            },
        );
        true
    }

    /// Unconditional set, used by `statusUpdate`.
    pub fn set(&self, id: &str, status: InstanceStatus, now: DateTime<Utc>) {
        self.entries.lock().insert(
            id.to_string(),
            Entry {
                status,
                accessed_at: now,
            },
        );
    }

    /// Returns the live override for `id`, bumping its access timestamp.
    /// Lazily evicts the entry if it has gone stale.
    pub fn get(&self, id: &str, now: DateTime<Utc>) -> Option<InstanceStatus> {
        let mut entries = self.entries.lock();
        match entries.get_mut(id) {
            Some(entry) if self.is_live(entry, now) => {
                entry.accessed_at = now;
                Some(entry.status)
            }
            Some(_) => {
                entries.remove(id);
                None
            }
            None => None,
        }
    }

    pub fn remove(&self, id: &str) -> Option<InstanceStatus> {
        self.entries.lock().remove(id).map(|e| e.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_bumps_access_ts_and_extends_ttl() {
        let map = OverridesMap::new(Duration::from_secs(60));
        let t0 = Utc::now();
        map.insert_if_absent("1", InstanceStatus::OutOfService, t0);

        let almost_expired = t0 + chrono::Duration::seconds(59);
        assert_eq!(map.get("1", almost_expired), Some(InstanceStatus::OutOfService));

        // Access bumped accessed_at to `almost_expired`; another 59s later
        // it is still live, even though 118s have passed since insertion.
        let would_be_expired_without_bump = almost_expired + chrono::Duration::seconds(59);
        assert_eq!(
            map.get("1", would_be_expired_without_bump),
            Some(InstanceStatus::OutOfService)
        );
    }

    #[test]
    fn entry_expires_when_untouched_past_ttl() {
        let map = OverridesMap::new(Duration::from_secs(60));
        let t0 = Utc::now();
        map.insert_if_absent("1", InstanceStatus::OutOfService, t0);

        assert_eq!(map.get("1", t0 + chrono::Duration::seconds(61)), None);
        assert_eq!(map.get("1", t0 + chrono::Duration::seconds(61)), None);
    }

    #[test]
    fn insert_if_absent_does_not_clobber_a_live_entry() {
        let map = OverridesMap::new(Duration::from_secs(60));
        let t0 = Utc::now();
        assert!(map.insert_if_absent("1", InstanceStatus::OutOfService, t0));
        assert!(!map.insert_if_absent("1", InstanceStatus::Up, t0));
        assert_eq!(map.get("1", t0), Some(InstanceStatus::OutOfService));
    }
}
