use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use registry_types::{ActionType, Application, Applications, InstanceInfo, InstanceStatus, RegistryConfig};

use crate::activity::ActivityRing;
use crate::arbiter;
use crate::asg::AsgOracle;
use crate::cache::ResponseCacheInvalidator;
use crate::change_log::ChangeLog;
use crate::clock::Clock;
use crate::lease::Lease;
use crate::overrides::OverridesMap;
use crate::remote::RemoteRegistries;
use crate::renewals::RenewalRateMeter;

type InstanceMap = HashMap<String, Lease>;

struct RenewalExpectation {
    expected_per_min: i64,
    threshold: i64,
}

/// The registry core (spec §2 "Registry Core", §4.3-§4.9): the two-level
/// `appName -> id -> Lease` mapping, its mutators, and the read views over
/// it.
///
/// `apps` is guarded by its own lock purely for the rare structural change
/// (a new app's bucket being created); the heavy, frequent traffic goes
/// through each bucket's own lock. `global_lock` is a separate, deliberately
/// "pointless looking" gate: mutators take its read side so they can run in
/// parallel against distinct instances, while the delta-snapshot read takes
/// its write side to guarantee no mutator is mid-append to the change log
/// (spec §5). It does not protect `apps` or the buckets directly — those
/// have their own locks — it exists purely to serialize "any mutator" against
/// "the delta reader".
pub struct RegistryCore {
    config: RegistryConfig,
    clock: Arc<dyn Clock>,
    cache: Arc<dyn ResponseCacheInvalidator>,
    asg_oracle: Arc<dyn AsgOracle>,
    remote: RemoteRegistries,

    global_lock: RwLock<()>,
    apps: RwLock<HashMap<String, Arc<RwLock<InstanceMap>>>>,
    overrides: OverridesMap,
    change_log: ChangeLog,
    renewal_meter: RenewalRateMeter,
    recent_registered: ActivityRing,
    recent_cancelled: ActivityRing,
    expectation: Mutex<RenewalExpectation>,
}

impl RegistryCore {
    /// Validates `config` before constructing the engine. Spec §6 enumerates
    /// these tunables but never says what embedders get for nonsensical
    /// values; this crate treats a bad value as construction-time
    /// misconfiguration rather than a silently-nonsensical running registry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorType::InvalidConfig`] if
    /// `renewal_percent_threshold` is outside `[0.0, 1.0]` or
    /// `eviction_duration_multiplier` is zero.
    pub fn new(
        config: RegistryConfig,
        clock: Arc<dyn Clock>,
        cache: Arc<dyn ResponseCacheInvalidator>,
        asg_oracle: Arc<dyn AsgOracle>,
    ) -> crate::error::Result<Self> {
        if !(0.0..=1.0).contains(&config.renewal_percent_threshold) {
            return Err(crate::error::ErrorType::InvalidConfig(format!(
                "renewal_percent_threshold must be within [0.0, 1.0], got {}",
                config.renewal_percent_threshold
            ))
            .into());
        }
        if config.eviction_duration_multiplier == 0 {
            return Err(crate::error::ErrorType::InvalidConfig(
                "eviction_duration_multiplier must be at least 1".to_string(),
            )
            .into());
        }

        let now = clock.now();
        let ring_capacity = config.recent_activity_ring_capacity;
        let overrides_ttl = config.overrides_access_ttl;
        Ok(Self {
            config,
            clock,
            cache,
            asg_oracle,
            remote: RemoteRegistries::new(),
            global_lock: RwLock::new(()),
            apps: RwLock::new(HashMap::new()),
            overrides: OverridesMap::new(overrides_ttl),
            change_log: ChangeLog::new(),
            renewal_meter: RenewalRateMeter::new(now),
            recent_registered: ActivityRing::new(ring_capacity),
            recent_cancelled: ActivityRing::new(ring_capacity),
            expectation: Mutex::new(RenewalExpectation {
                expected_per_min: 0,
                threshold: 0,
            }),
        })
    }

    #[must_use]
    pub fn with_remote_registries(mut self, remote: RemoteRegistries) -> Self {
        self.remote = remote;
        self
    }

    fn get_or_create_app(&self, app_name: &str) -> Arc<RwLock<InstanceMap>> {
        if let Some(existing) = self.apps.read().get(app_name) {
            return Arc::clone(existing);
        }
        let mut apps = self.apps.write();
        Arc::clone(
            apps.entry(app_name.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(HashMap::new()))),
        )
    }

    fn bump_expected_renews(&self, delta: i64) {
        let mut expectation = self.expectation.lock();
        expectation.expected_per_min += delta;
        expectation.threshold = self.config.renews_threshold(expectation.expected_per_min);
    }

    #[must_use]
    pub fn expected_number_of_renews_per_min(&self) -> i64 {
        self.expectation.lock().expected_per_min
    }

    #[must_use]
    pub fn renews_threshold(&self) -> i64 {
        self.expectation.lock().threshold
    }

    /// Self-preservation predicate (spec §4.8, I6): eviction stays enabled
    /// only while the observed renewal rate keeps up with the expected one.
    #[must_use]
    pub fn lease_expiration_enabled(&self) -> bool {
        let now = self.clock.now();
        self.renewal_meter.last_minute_rate(now) >= self.renews_threshold()
    }

    /// Upserts the lease for `(info.app_name, info.id)` (spec §4.3).
    #[tracing::instrument(skip(self, info), fields(app_name = %info.app_name, id = %info.id))]
    pub fn register(&self, mut info: InstanceInfo, lease_duration: Duration, is_replication: bool) {
        let now = self.clock.now();
        let _global = self.global_lock.read();
        let app = self.get_or_create_app(&info.app_name);
        let mut inner = app.write();

        let existing = inner.get(&info.id).cloned();
        if let Some(existing) = &existing {
            if existing.holder.last_dirty_timestamp > info.last_dirty_timestamp {
                info.last_dirty_timestamp = existing.holder.last_dirty_timestamp;
            }
        } else {
            self.bump_expected_renews(2);
        }
        let prior_service_up_ts = existing.as_ref().and_then(|l| l.service_up_ts);

        if info.overridden_status != InstanceStatus::Unknown {
            self.overrides.insert_if_absent(&info.id, info.overridden_status, now);
        }
        let override_status = self.overrides.get(&info.id, now);
        info.overridden_status = override_status.unwrap_or(InstanceStatus::Unknown);

        let asg_enabled = info
            .asg_name
            .as_deref()
            .map(|name| self.asg_oracle.is_enabled(name));

        let reported = info.status;
        let mut lease = Lease::new(info, lease_duration, now);
        if let Some(ts) = prior_service_up_ts {
            lease.service_up_ts = Some(ts);
        }

        let effective = arbiter::get_overridden_instance_status(
            reported,
            existing.as_ref(),
            is_replication,
            override_status,
            asg_enabled,
        );
        lease.holder.status = effective;
        if effective == InstanceStatus::Up {
            lease.service_up(now);
        }

        lease.holder.action_type = ActionType::Added;
        lease.holder.last_updated_timestamp = now;

        self.recent_registered
            .add(now, format!("{}({})", lease.holder.app_name, lease.holder.id));

        let app_name = lease.holder.app_name.clone();
        let vip = lease.holder.vip_address.clone();
        let secure_vip = lease.holder.secure_vip_address.clone();
        let snapshot = lease.holder.clone();
        inner.insert(snapshot.id.clone(), lease);
        drop(inner);
        drop(_global);

        self.change_log.append(snapshot, now);
        self.cache.invalidate(&app_name, vip.as_deref(), secure_vip.as_deref());
    }

    /// Heartbeat (spec §4.4). `false` means the caller should re-register:
    /// either the lease is gone, or the arbiter resolved `UNKNOWN` (the
    /// override backing its status vanished).
    #[tracing::instrument(skip(self))]
    pub fn renew(&self, app_name: &str, id: &str, is_replication: bool) -> bool {
        let now = self.clock.now();
        let _global = self.global_lock.read();
        let Some(app) = self.apps.read().get(app_name).cloned() else {
            return false;
        };
        let mut inner = app.write();
        let Some(lease) = inner.get_mut(id) else {
            return false;
        };

        let override_status = self.overrides.get(id, now);
        let asg_enabled = lease
            .holder
            .asg_name
            .clone()
            .map(|name| self.asg_oracle.is_enabled(&name));
        let snapshot = lease.clone();
        let effective = arbiter::get_overridden_instance_status(
            lease.holder.status,
            Some(&snapshot),
            is_replication,
            override_status,
            asg_enabled,
        );
        if effective == InstanceStatus::Unknown {
            return false;
        }
        if effective != lease.holder.status {
            lease.holder.status = effective;
        }
        lease.renew(now);
        drop(inner);
        drop(_global);

        self.renewal_meter.increment(now);
        true
    }

    /// Removes the lease (spec §4.5). Returns `false` if it was already
    /// gone.
    #[tracing::instrument(skip(self))]
    pub fn cancel(&self, app_name: &str, id: &str, _is_replication: bool) -> bool {
        let now = self.clock.now();
        let _global = self.global_lock.read();
        let removed = match self.apps.read().get(app_name).cloned() {
            Some(app) => app.write().remove(id),
            None => None,
        };
        drop(_global);

        self.recent_cancelled.add(now, format!("{app_name}({id})"));
        self.overrides.remove(id);

        let Some(mut lease) = removed else {
            return false;
        };
        lease.cancel(now);
        lease.holder.action_type = ActionType::Deleted;
        lease.holder.last_updated_timestamp = now;
        let vip = lease.holder.vip_address.clone();
        let secure_vip = lease.holder.secure_vip_address.clone();
        self.change_log.append(lease.holder.clone(), now);
        self.cache
            .invalidate(app_name, vip.as_deref(), secure_vip.as_deref());
        true
    }

    /// Operator status override (spec §4.6).
    #[tracing::instrument(skip(self))]
    pub fn status_update(
        &self,
        app_name: &str,
        id: &str,
        new_status: InstanceStatus,
        last_dirty_timestamp: i64,
        is_replication: bool,
    ) -> bool {
        let now = self.clock.now();
        let _global = self.global_lock.read();
        let Some(app) = self.apps.read().get(app_name).cloned() else {
            return false;
        };
        let mut inner = app.write();
        let Some(lease) = inner.get_mut(id) else {
            return false;
        };

        reconcile_via_arbiter(lease, &self.overrides, self.asg_oracle.as_ref(), is_replication, now);

        self.overrides.set(id, new_status, now);
        lease.holder.overridden_status = new_status;
        apply_status_with_dirty_reconciliation(lease, new_status, last_dirty_timestamp, now);

        lease.holder.action_type = ActionType::Modified;
        lease.holder.last_updated_timestamp = now;
        let snapshot = lease.holder.clone();
        drop(inner);
        drop(_global);

        self.change_log.append(snapshot.clone(), now);
        self.cache.invalidate(
            app_name,
            snapshot.vip_address.as_deref(),
            snapshot.secure_vip_address.as_deref(),
        );
        true
    }

    /// Removes an operator status override (spec §4.7) — mirror image of
    /// `status_update`, adopting `new_status` directly rather than consulting
    /// the (now-removed) override.
    #[tracing::instrument(skip(self))]
    pub fn delete_status_override(
        &self,
        app_name: &str,
        id: &str,
        new_status: InstanceStatus,
        last_dirty_timestamp: i64,
        is_replication: bool,
    ) -> bool {
        let now = self.clock.now();
        let _global = self.global_lock.read();
        let Some(app) = self.apps.read().get(app_name).cloned() else {
            return false;
        };
        let mut inner = app.write();
        let Some(lease) = inner.get_mut(id) else {
            return false;
        };

        reconcile_via_arbiter(lease, &self.overrides, self.asg_oracle.as_ref(), is_replication, now);

        self.overrides.remove(id);
        lease.holder.overridden_status = InstanceStatus::Unknown;
        apply_status_with_dirty_reconciliation(lease, new_status, last_dirty_timestamp, now);

        lease.holder.action_type = ActionType::Modified;
        lease.holder.last_updated_timestamp = now;
        let snapshot = lease.holder.clone();
        drop(inner);
        drop(_global);

        self.change_log.append(snapshot.clone(), now);
        self.cache.invalidate(
            app_name,
            snapshot.vip_address.as_deref(),
            snapshot.secure_vip_address.as_deref(),
        );
        true
    }

    /// Scans every lease and cancels the expired ones, unless
    /// self-preservation has disabled expiration (spec §4.8).
    #[tracing::instrument(skip(self))]
    pub fn sweep_expired_leases(&self) -> usize {
        if !self.lease_expiration_enabled() {
            tracing::debug!("self-preservation active; skipping eviction sweep");
            return 0;
        }
        let now = self.clock.now();
        let mut victims = Vec::new();
        {
            let apps = self.apps.read();
            for (app_name, inner) in apps.iter() {
                let inner = inner.read();
                for (id, lease) in inner.iter() {
                    if lease.is_expired(now, self.config.eviction_duration_multiplier) {
                        victims.push((app_name.clone(), id.clone()));
                    }
                }
            }
        }
        let evicted = victims
            .into_iter()
            .filter(|(app_name, id)| self.cancel(app_name, id, false))
            .count();
        if evicted > 0 {
            tracing::info!(count = evicted, "eviction sweep cancelled expired leases");
        }
        evicted
    }

    /// Drops change-log entries past their retention window (spec §4.10).
    pub fn prune_change_log(&self) -> usize {
        let now = self.clock.now();
        self.change_log
            .prune_older_than(self.config.retention_in_delta_queue, now)
    }

    fn is_hidden(&self, lease: &Lease, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.lease_expiration_enabled() && lease.is_expired(now, self.config.eviction_duration_multiplier)
    }

    /// Local-only application lookup (spec §4.9).
    #[must_use]
    pub fn get_application_local(&self, app_name: &str) -> Option<Application> {
        let apps = self.apps.read();
        let inner = apps.get(app_name)?.read();
        let now = self.clock.now();
        let mut app = Application::new(app_name);
        for lease in inner.values() {
            if self.is_hidden(lease, now) {
                continue;
            }
            app.instances.push(crate::reads::decorate(lease));
        }
        if app.instances.is_empty() {
            None
        } else {
            Some(app)
        }
    }

    /// `getApplication(appName, includeRemote)` (spec §4.9): local lookup,
    /// falling back to the first remote region with a non-empty answer.
    pub async fn get_application(&self, app_name: &str, include_remote: bool) -> Option<Application> {
        if let Some(app) = self.get_application_local(app_name) {
            return Some(app);
        }
        if include_remote && !self.config.disable_transparent_fallback_to_other_region {
            return self.remote.first_hit(app_name).await;
        }
        None
    }

    /// Full local snapshot (spec §4.9). `version` is installed verbatim from
    /// the response cache's version counter — an external collaborator this
    /// crate never owns (spec §1, §6).
    #[must_use]
    pub fn get_applications(&self, version: u64) -> Applications {
        let now = self.clock.now();
        let apps = self.apps.read();
        let mut out = Applications::new(version);
        for (app_name, inner) in apps.iter() {
            let inner = inner.read();
            let mut app = Application::new(app_name.clone());
            for lease in inner.values() {
                if self.is_hidden(lease, now) {
                    continue;
                }
                app.instances.push(crate::reads::decorate(lease));
            }
            if !app.instances.is_empty() {
                out.applications.push(app);
            }
        }
        crate::reads::recompute_hash(&mut out);
        out
    }

    /// `getApplicationsFromMultipleRegions` (spec §4.9, P7): local snapshot
    /// merged with each requested region's whitelisted applications.
    pub async fn get_applications_from_multiple_regions(&self, regions: &[String], version: u64) -> Applications {
        let mut out = self.get_applications(version);
        self.remote
            .merge_applications_into(regions, |region| self.config.whitelist_for_region(region).cloned(), &mut out)
            .await;
        crate::reads::recompute_hash(&mut out);
        out
    }

    /// `getApplicationDeltasFromMultipleRegions` (spec §4.9, §9 open
    /// question): the returned `apps_hash_code` is computed from the **full**
    /// current union snapshot over the same region set, not from the delta
    /// itself — preserved verbatim per spec §9 for wire compatibility.
    pub async fn get_application_deltas_from_multiple_regions(
        &self,
        regions: &[String],
        version: u64,
    ) -> Applications {
        let entries = {
            let _global = self.global_lock.write();
            self.change_log.snapshot()
        };

        let mut delta = Applications::new(version);
        for entry in entries {
            let app = delta.get_or_create(&entry.instance.app_name);
            app.instances.push(entry.instance);
        }
        self.remote
            .merge_deltas_into(regions, |region| self.config.whitelist_for_region(region).cloned(), &mut delta)
            .await;

        let full = self.get_applications_from_multiple_regions(regions, version).await;
        delta.apps_hash_code = full.apps_hash_code;
        delta
    }

    #[must_use]
    pub fn get_instance_by_app_and_id(&self, app_name: &str, id: &str) -> Option<InstanceInfo> {
        let apps = self.apps.read();
        let inner = apps.get(app_name)?.read();
        let lease = inner.get(id)?;
        let now = self.clock.now();
        if self.is_hidden(lease, now) {
            return None;
        }
        Some(crate::reads::decorate(lease))
    }

    #[must_use]
    pub fn get_instances_by_id(&self, id: &str) -> Vec<InstanceInfo> {
        let now = self.clock.now();
        let apps = self.apps.read();
        let mut out = Vec::new();
        for inner in apps.values() {
            let inner = inner.read();
            if let Some(lease) = inner.get(id) {
                if self.is_hidden(lease, now) {
                    continue;
                }
                out.push(crate::reads::decorate(lease));
            }
        }
        out
    }
}

/// Shared by `status_update`/`delete_status_override`: re-arbitrate the
/// lease's status the same way `renew` does, before the caller-driven status
/// change is layered on top (spec §4.6/§4.7, "renew the lease").
fn reconcile_via_arbiter(
    lease: &mut Lease,
    overrides: &OverridesMap,
    asg_oracle: &dyn AsgOracle,
    is_replication: bool,
    now: chrono::DateTime<chrono::Utc>,
) {
    let override_status = overrides.get(&lease.holder.id, now);
    let asg_enabled = lease
        .holder
        .asg_name
        .clone()
        .map(|name| asg_oracle.is_enabled(&name));
    let snapshot = lease.clone();
    let reconciled = arbiter::get_overridden_instance_status(
        lease.holder.status,
        Some(&snapshot),
        is_replication,
        override_status,
        asg_enabled,
    );
    if reconciled != InstanceStatus::Unknown {
        lease.holder.status = reconciled;
    }
    lease.renew(now);
}

/// Dirty-timestamp reconciliation shared by `status_update` and
/// `delete_status_override` (spec §4.6/§4.7, invariant I3): a newer incoming
/// dirty timestamp replaces both fields atomically; otherwise the status
/// still changes, but the dirty timestamp only ever moves forward.
fn apply_status_with_dirty_reconciliation(
    lease: &mut Lease,
    new_status: InstanceStatus,
    last_dirty_timestamp: i64,
    now: chrono::DateTime<chrono::Utc>,
) {
    if last_dirty_timestamp > lease.holder.last_dirty_timestamp {
        lease.holder.last_dirty_timestamp = last_dirty_timestamp;
        lease.holder.status = new_status;
    } else {
        lease.holder.status = new_status;
        lease.holder.last_dirty_timestamp = lease.holder.last_dirty_timestamp.max(now.timestamp_millis());
    }
}
