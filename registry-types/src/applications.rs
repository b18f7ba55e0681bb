use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::instance::InstanceInfo;
use crate::status::InstanceStatus;

/// All instances registered under one application name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub instances: Vec<InstanceInfo>,
}

impl Application {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
        }
    }
}

/// A full or delta snapshot of the registry, as handed to callers by the read
/// views in spec §4.9.
///
/// `version` is the monotonic counter installed by the response cache's
/// `getVersionDelta`/`getVersionDeltaWithRegions` (spec §6); `apps_hash_code`
/// is the reconcile hash described in spec §4.9 and §9 — computed from the
/// full current snapshot, even for delta responses, by design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Applications {
    pub version: u64,
    pub apps_hash_code: String,
    pub applications: Vec<Application>,
}

impl Applications {
    #[must_use]
    pub fn new(version: u64) -> Self {
        Self {
            version,
            apps_hash_code: String::new(),
            applications: Vec::new(),
        }
    }

    /// Look up (or lazily create) the application bucket by name. Mirrors
    /// the on-demand app-entry creation spec §4.9 requires when merging
    /// remote-region instances into a running union snapshot.
    pub fn get_or_create(&mut self, name: &str) -> &mut Application {
        if let Some(pos) = self.applications.iter().position(|a| a.name == name) {
            return &mut self.applications[pos];
        }
        self.applications.push(Application::new(name));
        self.applications.last_mut().expect("just pushed")
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.name == name)
    }

    /// Recompute `apps_hash_code` from the current instance status
    /// distribution. This is the "reconcile hash" (spec glossary): a
    /// fingerprint over `{status -> count}` pairs, not over the delta being
    /// returned.
    pub fn recompute_hash(&mut self) {
        self.apps_hash_code = reconcile_hash(&self.applications);
    }
}

/// `UP_12_DOWN_1_STARTING_3_` style fingerprint, matching the
/// status-distribution reconcile hash scheme described in spec §4.9/§9.
/// Statuses are ordered alphabetically so the hash is stable regardless of
/// insertion order.
#[must_use]
pub fn reconcile_hash(applications: &[Application]) -> String {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for app in applications {
        for instance in &app.instances {
            *counts.entry(status_label(instance.status)).or_insert(0) += 1;
        }
    }
    let mut out = String::new();
    for (status, count) in counts {
        out.push_str(status);
        out.push('_');
        out.push_str(&count.to_string());
        out.push('_');
    }
    out
}

fn status_label(status: InstanceStatus) -> &'static str {
    match status {
        InstanceStatus::Up => "UP",
        InstanceStatus::Down => "DOWN",
        InstanceStatus::Starting => "STARTING",
        InstanceStatus::OutOfService => "OUTOFSERVICE",
        InstanceStatus::Unknown => "UNKNOWN",
    }
}
