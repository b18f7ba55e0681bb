use registry_types::InstanceStatus;

use crate::lease::Lease;

/// Pure, side-effect-free precedence function choosing the effective status
/// of an instance (spec §4.2). Extracted standalone so every branch is a
/// one-line unit test (spec §8 P6).
///
/// - `reported`: the status the caller asserted.
/// - `existing_lease`: the lease already on file for this `(app, id)`, if any.
/// - `is_replication`: true when the caller is a peer replicating a write,
///   not the instance itself.
/// - `override_status`: the current entry in the overrides map, if any.
/// - `asg_enabled`: `Some(bool)` when the instance carries an ASG name and
///   the oracle has an opinion, `None` otherwise.
#[must_use]
pub fn get_overridden_instance_status(
    reported: InstanceStatus,
    existing_lease: Option<&Lease>,
    is_replication: bool,
    override_status: Option<InstanceStatus>,
    asg_enabled: Option<bool>,
) -> InstanceStatus {
    // 1. STARTING, DOWN, and UNKNOWN are always believed.
    if !matches!(reported, InstanceStatus::Up | InstanceStatus::OutOfService) {
        return reported;
    }

    // 2. An operator override always wins over a believable report.
    if let Some(status) = override_status {
        return status;
    }

    // 3. ASG-derived status, when the instance belongs to one.
    if let Some(enabled) = asg_enabled {
        return if enabled {
            InstanceStatus::Up
        } else {
            InstanceStatus::OutOfService
        };
    }

    // 4. The server sticks to its own opinion on a non-replicated write.
    if !is_replication {
        if let Some(lease) = existing_lease {
            if matches!(
                lease.holder.status,
                InstanceStatus::Up | InstanceStatus::OutOfService
            ) {
                return lease.holder.status;
            }
        }
    }

    // 5. Nothing overrides it — trust the report.
    reported
}
