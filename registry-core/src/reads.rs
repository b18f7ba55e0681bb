use registry_types::{Applications, InstanceInfo, LeaseInfo};

use crate::lease::Lease;

/// Builds the caller-facing, decorated copy of a lease's `InstanceInfo`
/// (spec §4.9): a fresh `leaseInfo` summary plus the coordinating-server
/// flag. Never returns a reference into the authoritative `Lease` — spec §9
/// flags "source reads mutate the returned `InstanceInfo`" as a hazard in
/// the teacher's own read path, and this crate takes the safer alternative
/// it recommends.
#[must_use]
pub fn decorate(lease: &Lease) -> InstanceInfo {
    let mut holder = lease.holder.clone();
    #[allow(clippy::cast_possible_truncation)]
    let duration_sec = lease.duration.as_secs() as u32;
    holder.lease_info = Some(LeaseInfo {
        registration_ts: lease.registration_ts,
        last_renewal_ts: lease.last_renewal_ts,
        service_up_ts: lease.service_up_ts,
        eviction_ts: lease.eviction_ts,
        renewal_interval_sec: duration_sec,
        duration_sec,
    });
    holder.is_coordinating_discovery_server = true;
    holder
}

/// Recomputes the reconcile hash on a snapshot or union view (spec §4.9,
/// §9). Thin glue over `registry_types::Applications::recompute_hash` — kept
/// here rather than called directly so every read view goes through one
/// place for this step, matching the module split spec §2 describes.
pub fn recompute_hash(applications: &mut Applications) {
    applications.recompute_hash();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use registry_types::{InstanceInfo as Info, InstanceStatus};

    use super::*;

    #[test]
    fn decorate_builds_a_lease_info_summary() {
        let holder = Info::new("A", "1", InstanceStatus::Up);
        let lease = Lease::new(holder, Duration::from_secs(30), Utc::now());

        let decorated = decorate(&lease);
        let lease_info = decorated.lease_info.expect("lease_info set");
        assert_eq!(lease_info.duration_sec, 30);
        assert_eq!(lease_info.renewal_interval_sec, 30);
        assert!(decorated.is_coordinating_discovery_server);
    }
}
