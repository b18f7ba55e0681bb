use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use registry_types::{Application, Applications};

use crate::error::{Error, ErrorType};

/// A remote region's own transport/deserialization failure — opaque to this
/// crate, which only knows how to wrap it into [`ErrorType::RemoteRegion`].
pub type RemoteError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One remote peer's registry surface (spec §6). Each region's handle
/// returns the same `Applications` shape the local registry does; errors are
/// the region's own (network, deserialization), not this crate's.
#[async_trait]
pub trait RemoteRegistry: Send + Sync {
    async fn get_application(&self, name: &str) -> Result<Option<Application>, RemoteError>;
    async fn get_applications(&self) -> Result<Applications, RemoteError>;
    async fn get_application_deltas(&self) -> Result<Applications, RemoteError>;
}

/// Map of region name -> remote registry handle (spec §2, "Remote Region
/// Aggregator"). Construction/wiring is the embedder's job; this type only
/// applies the union and whitelist semantics spec §4.9 describes.
#[derive(Default)]
pub struct RemoteRegistries {
    regions: HashMap<String, Arc<dyn RemoteRegistry>>,
}

impl RemoteRegistries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_region(&mut self, region: impl Into<String>, handle: Arc<dyn RemoteRegistry>) {
        self.regions.insert(region.into(), handle);
    }

    #[must_use]
    pub fn handle(&self, region: &str) -> Option<&Arc<dyn RemoteRegistry>> {
        self.regions.get(region)
    }

    /// First-hit-wins lookup across every registered region, in iteration
    /// order. Used by `getApplication(name, includeRemote=true)` once the
    /// local lookup has already come up empty. A region that errors is
    /// logged and skipped, same as a region that simply doesn't have the
    /// app (spec §7: per-entry failures are swallowed, not propagated).
    pub async fn first_hit(&self, name: &str) -> Option<Application> {
        for (region, handle) in &self.regions {
            match handle.get_application(name).await {
                Ok(Some(app)) => return Some(app),
                Ok(None) => {}
                Err(source) => log_remote_failure(region, source),
            }
        }
        None
    }

    /// Merges each requested region's full application set into `into`,
    /// filtered by that region's whitelist (falling back to the global
    /// whitelist, spec §4.9/P7). Unknown regions are silently skipped — the
    /// embedder is responsible for only asking about regions it wired up.
    pub async fn merge_applications_into(
        &self,
        regions: &[String],
        whitelist: impl Fn(&str) -> Option<std::collections::HashSet<String>>,
        into: &mut Applications,
    ) {
        let fetches = regions.iter().filter_map(|region| {
            let handle = self.regions.get(region)?;
            Some(async move { (region, handle.get_applications().await) })
        });
        for (region, remote) in futures::future::join_all(fetches).await {
            match remote {
                Ok(apps) => merge_whitelisted(apps, whitelist(region), into),
                Err(source) => log_remote_failure(region, source),
            }
        }
    }

    /// Same as [`merge_applications_into`](Self::merge_applications_into) but
    /// over delta snapshots, for `getApplicationDeltasFromMultipleRegions`.
    pub async fn merge_deltas_into(
        &self,
        regions: &[String],
        whitelist: impl Fn(&str) -> Option<std::collections::HashSet<String>>,
        into: &mut Applications,
    ) {
        let fetches = regions.iter().filter_map(|region| {
            let handle = self.regions.get(region)?;
            Some(async move { (region, handle.get_application_deltas().await) })
        });
        for (region, remote) in futures::future::join_all(fetches).await {
            match remote {
                Ok(apps) => merge_whitelisted(apps, whitelist(region), into),
                Err(source) => log_remote_failure(region, source),
            }
        }
    }
}

fn log_remote_failure(region: &str, source: RemoteError) {
    let error: Error = ErrorType::RemoteRegion {
        region: region.to_string(),
        source,
    }
    .into();
    tracing::warn!(region, %error, "remote region request failed; skipping");
}

fn merge_whitelisted(
    remote: Applications,
    whitelist: Option<std::collections::HashSet<String>>,
    into: &mut Applications,
) {
    for app in remote.applications {
        if let Some(allowed) = &whitelist {
            if !allowed.contains(&app.name) {
                continue;
            }
        }
        let bucket = into.get_or_create(&app.name);
        bucket.instances.extend(app.instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_types::{InstanceInfo, InstanceStatus};
    use std::collections::HashSet;
    use std::fmt;

    struct StubRegion(Applications);

    #[async_trait]
    impl RemoteRegistry for StubRegion {
        async fn get_application(&self, name: &str) -> Result<Option<Application>, RemoteError> {
            Ok(self.0.get(name).cloned())
        }
        async fn get_applications(&self) -> Result<Applications, RemoteError> {
            Ok(self.0.clone())
        }
        async fn get_application_deltas(&self) -> Result<Applications, RemoteError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct StubFailure;

    impl fmt::Display for StubFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "stub region unreachable")
        }
    }
    impl std::error::Error for StubFailure {}

    struct FailingRegion;

    #[async_trait]
    impl RemoteRegistry for FailingRegion {
        async fn get_application(&self, _name: &str) -> Result<Option<Application>, RemoteError> {
            Err(Box::new(StubFailure))
        }
        async fn get_applications(&self) -> Result<Applications, RemoteError> {
            Err(Box::new(StubFailure))
        }
        async fn get_application_deltas(&self) -> Result<Applications, RemoteError> {
            Err(Box::new(StubFailure))
        }
    }

    fn app_with_one_instance(name: &str) -> Applications {
        let mut apps = Applications::new(1);
        let bucket = apps.get_or_create(name);
        bucket
            .instances
            .push(InstanceInfo::new(name, "1", InstanceStatus::Up));
        apps
    }

    #[tokio::test]
    async fn whitelist_excludes_app_not_listed() {
        let mut regions = RemoteRegistries::new();
        regions.register_region("east", Arc::new(StubRegion(app_with_one_instance("A"))));

        let mut into = Applications::new(1);
        regions
            .merge_applications_into(
                &["east".to_string()],
                |_| Some(HashSet::from(["B".to_string()])),
                &mut into,
            )
            .await;

        assert!(into.get("A").is_none());
    }

    #[tokio::test]
    async fn missing_whitelist_allows_everything() {
        let mut regions = RemoteRegistries::new();
        regions.register_region("east", Arc::new(StubRegion(app_with_one_instance("A"))));

        let mut into = Applications::new(1);
        regions
            .merge_applications_into(&["east".to_string()], |_| None, &mut into)
            .await;

        assert!(into.get("A").is_some());
    }

    #[tokio::test]
    async fn first_hit_wins_across_regions() {
        let mut regions = RemoteRegistries::new();
        regions.register_region("east", Arc::new(StubRegion(Applications::new(1))));
        regions.register_region("west", Arc::new(StubRegion(app_with_one_instance("B"))));

        let found = regions.first_hit("B").await;
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn a_failing_region_is_skipped_not_propagated() {
        let mut regions = RemoteRegistries::new();
        regions.register_region("east", Arc::new(FailingRegion));
        regions.register_region("west", Arc::new(StubRegion(app_with_one_instance("B"))));

        assert!(regions.first_hit("B").await.is_some());

        let mut into = Applications::new(1);
        regions
            .merge_applications_into(&["east".to_string(), "west".to_string()], |_| None, &mut into)
            .await;
        assert!(into.get("B").is_some());
    }
}
