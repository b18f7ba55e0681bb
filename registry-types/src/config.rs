use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables enumerated in spec §6. Deserializable from the embedding
/// application's configuration layer; the registry core never reads files or
/// environment variables itself (that responsibility sits outside this
/// crate, per spec §1's "out of scope" list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    /// Fraction (0.0-1.0) of the expected renewal rate below which
    /// self-preservation trips (spec I6).
    pub renewal_percent_threshold: f64,
    #[serde(with = "humantime_serde")]
    pub eviction_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub delta_retention_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub retention_in_delta_queue: Duration,
    /// region -> base URL, used by the embedding app to construct the
    /// `RemoteRegistry` handles this crate is handed; the core itself never
    /// dials out.
    pub remote_region_urls_with_name: HashMap<String, String>,
    /// Per-region application whitelist (spec §4.9, §8 P7). Absent region ->
    /// falls back to `global_app_whitelist`; empty/missing whitelist allows
    /// everything.
    pub remote_region_app_whitelist: HashMap<String, HashSet<String>>,
    pub global_app_whitelist: Option<HashSet<String>>,
    pub disable_transparent_fallback_to_other_region: bool,
    /// Access-TTL for operator status overrides (spec §3, §9). One hour by
    /// default; deliberately long so operator intent survives a
    /// re-registration.
    #[serde(with = "humantime_serde")]
    pub overrides_access_ttl: Duration,
    /// Multiplier applied to a lease's configured duration before it is
    /// considered expired (spec §4.1, the clock-skew compensation). Spec §9
    /// flags this as inherited and undocumented upstream — preserved
    /// verbatim here and surfaced as configuration rather than guessed at.
    pub eviction_duration_multiplier: u32,
    pub recent_activity_ring_capacity: usize,
}

impl RegistryConfig {
    #[must_use]
    pub fn whitelist_for_region(&self, region: &str) -> Option<&HashSet<String>> {
        self.remote_region_app_whitelist
            .get(region)
            .or(self.global_app_whitelist.as_ref())
    }

    #[must_use]
    pub fn renews_threshold(&self, expected_number_of_renews_per_min: i64) -> i64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let threshold = (expected_number_of_renews_per_min as f64 * self.renewal_percent_threshold).floor();
        threshold as i64
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            renewal_percent_threshold: 0.85,
            eviction_interval: Duration::from_secs(60),
            delta_retention_interval: Duration::from_secs(30),
            retention_in_delta_queue: Duration::from_secs(3 * 60),
            remote_region_urls_with_name: HashMap::new(),
            remote_region_app_whitelist: HashMap::new(),
            global_app_whitelist: None,
            disable_transparent_fallback_to_other_region: false,
            overrides_access_ttl: Duration::from_secs(60 * 60),
            eviction_duration_multiplier: 2,
            recent_activity_ring_capacity: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_floors_the_product() {
        let config = RegistryConfig {
            renewal_percent_threshold: 0.85,
            ..RegistryConfig::default()
        };
        // 200 * 0.85 = 170.0
        assert_eq!(config.renews_threshold(200), 170);
        // 201 * 0.85 = 170.85 -> floors to 170
        assert_eq!(config.renews_threshold(201), 170);
    }

    #[test]
    fn whitelist_falls_back_to_global() {
        let mut config = RegistryConfig {
            global_app_whitelist: Some(HashSet::from(["GLOBAL-APP".to_string()])),
            ..RegistryConfig::default()
        };
        config
            .remote_region_app_whitelist
            .insert("us-east-1".into(), HashSet::from(["EAST-APP".to_string()]));

        assert_eq!(
            config.whitelist_for_region("us-east-1"),
            Some(&HashSet::from(["EAST-APP".to_string()]))
        );
        assert_eq!(
            config.whitelist_for_region("eu-west-1"),
            Some(&HashSet::from(["GLOBAL-APP".to_string()]))
        );
    }
}
