use serde::{Deserialize, Serialize};
use strum::Display;

/// Closed set of instance statuses understood by the registry core.
///
/// `Starting` and `Down` are always believed when reported by a client; the
/// arbiter in `registry-core::arbiter` only arbitrates between `Up` and
/// `OutOfService`. See spec §4.2 for the full precedence rules.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum InstanceStatus {
    Up,
    Down,
    Starting,
    OutOfService,
    Unknown,
}

impl Default for InstanceStatus {
    fn default() -> Self {
        InstanceStatus::Unknown
    }
}
