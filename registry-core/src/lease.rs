use std::time::Duration;

use chrono::{DateTime, Utc};
use registry_types::InstanceInfo;

/// One instance's time-bounded registration (spec §3, §4.1).
///
/// `holder` carries the caller-facing `InstanceInfo`; the timestamps here are
/// the authoritative ones — `holder.last_updated_timestamp` is a separate,
/// server-assigned field bumped by the mutators, not read back from here.
#[derive(Debug, Clone)]
pub struct Lease {
    pub holder: InstanceInfo,
    pub duration: Duration,
    pub registration_ts: DateTime<Utc>,
    pub last_renewal_ts: DateTime<Utc>,
    pub eviction_ts: Option<DateTime<Utc>>,
    pub service_up_ts: Option<DateTime<Utc>>,
}

impl Lease {
    #[must_use]
    pub fn new(holder: InstanceInfo, duration: Duration, now: DateTime<Utc>) -> Self {
        Self {
            holder,
            duration,
            registration_ts: now,
            last_renewal_ts: now,
            eviction_ts: None,
            service_up_ts: None,
        }
    }

    pub fn renew(&mut self, now: DateTime<Utc>) {
        self.last_renewal_ts = now;
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.eviction_ts = Some(now);
    }

    /// Sets `service_up_ts` on first transition to `UP`; a no-op on every
    /// later call for the same lease.
    pub fn service_up(&mut self, now: DateTime<Utc>) {
        if self.service_up_ts.is_none() {
            self.service_up_ts = Some(now);
        }
    }

    /// `evictionTs != 0 || now > lastRenewalTs + multiplier*durationMs`.
    ///
    /// The multiplier defaults to 2 — a clock-skew compensation inherited
    /// undocumented (spec §9 open question) and preserved verbatim here,
    /// surfaced as `RegistryConfig::eviction_duration_multiplier` rather than
    /// hardcoded.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, duration_multiplier: u32) -> bool {
        if self.eviction_ts.is_some() {
            return true;
        }
        let Some(skew_compensated) = self.duration.checked_mul(duration_multiplier) else {
            return true;
        };
        let Ok(allowance) = chrono::Duration::from_std(skew_compensated) else {
            return true;
        };
        now > self.last_renewal_ts + allowance
    }
}
