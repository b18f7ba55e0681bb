/// The response cache's invalidation contract (spec §6, invariant I4). The
/// core calls this exactly once per successful mutator, after the mutation
/// is visible to subsequent reads, and before the mutator returns.
pub trait ResponseCacheInvalidator: Send + Sync {
    fn invalidate(&self, app_name: &str, vip_address: Option<&str>, secure_vip_address: Option<&str>);
}

/// An invalidator that does nothing — for embedders with no response cache
/// in front of the registry.
#[derive(Debug, Default)]
pub struct NoopCacheInvalidator;

impl ResponseCacheInvalidator for NoopCacheInvalidator {
    fn invalidate(&self, _app_name: &str, _vip_address: Option<&str>, _secure_vip_address: Option<&str>) {}
}
