use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::ActionType;
use crate::status::InstanceStatus;

/// A point-in-time summary of a lease's timing, handed back to callers on
/// every read (spec §4.9). Rebuilt fresh on each read; never stored on the
/// authoritative `Lease`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseInfo {
    pub registration_ts: DateTime<Utc>,
    pub last_renewal_ts: DateTime<Utc>,
    pub service_up_ts: Option<DateTime<Utc>>,
    pub eviction_ts: Option<DateTime<Utc>>,
    pub renewal_interval_sec: u32,
    pub duration_sec: u32,
}

/// Identity and reported state of one service instance.
///
/// Mutated by the registry core in the narrow ways spec §3 allows: `status`,
/// `overridden_status`, `action_type`, the two timestamps, and `lease_info`
/// are server-owned; everything else is caller-supplied at registration and
/// carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub app_name: String,
    pub id: String,
    pub status: InstanceStatus,
    pub overridden_status: InstanceStatus,
    pub action_type: ActionType,
    /// Client-supplied, monotonic by convention. Never interpreted as
    /// wall-clock time by the core — see spec invariant I3.
    pub last_dirty_timestamp: i64,
    pub last_updated_timestamp: DateTime<Utc>,
    pub vip_address: Option<String>,
    pub secure_vip_address: Option<String>,
    pub asg_name: Option<String>,
    pub lease_info: Option<LeaseInfo>,
    /// Set by the read path to mark this server as the coordinating
    /// discovery server for the response (spec §4.9).
    pub is_coordinating_discovery_server: bool,
}

impl InstanceInfo {
    #[must_use]
    pub fn new(app_name: impl Into<String>, id: impl Into<String>, status: InstanceStatus) -> Self {
        let now = Utc::now();
        Self {
            app_name: app_name.into(),
            id: id.into(),
            status,
            overridden_status: InstanceStatus::Unknown,
            action_type: ActionType::Added,
            last_dirty_timestamp: now.timestamp_millis(),
            last_updated_timestamp: now,
            vip_address: None,
            secure_vip_address: None,
            asg_name: None,
            lease_info: None,
            is_coordinating_discovery_server: false,
        }
    }
}
