//! Registry capabilities consumed by the ladder, reconciler and controller.
//!
//! Each component depends on the narrowest trait it needs so it can be
//! driven by [`StateStore`](crate::StateStore) in production and by
//! [`MemoryRegistry`](crate::MemoryRegistry) in tests.

use crate::error::StateResult;
use crate::types::*;

/// Read access to the policy set.
pub trait PolicySource: Send + Sync {
    /// List every policy. No ordering is guaranteed.
    fn list_policies(&self) -> StateResult<Vec<Policy>>;

    /// Get a policy by exact name.
    fn get_policy(&self, name: &str) -> StateResult<Option<Policy>>;
}

/// Versioned storage for autoscaler resources.
pub trait AutoscalerRegistry: Send + Sync {
    fn get_autoscaler(&self, key: &str) -> StateResult<Option<AutoscalerResource>>;

    /// Insert a resource that must not exist yet. Returns the stored copy
    /// with its initial `resource_version`.
    fn create_autoscaler(&self, resource: &AutoscalerResource)
        -> StateResult<AutoscalerResource>;

    /// Replace a resource if its stored version equals
    /// `resource.resource_version`; fails with `Conflict` otherwise.
    fn update_autoscaler(&self, resource: &AutoscalerResource)
        -> StateResult<AutoscalerResource>;

    /// Delete by key. Returns true if it existed.
    fn delete_autoscaler(&self, key: &str) -> StateResult<bool>;
}

/// Storage for policy recommendations, one per workload.
pub trait RecommendationRegistry: Send + Sync {
    fn get_recommendation(&self, key: &str) -> StateResult<Option<PolicyRecommendation>>;

    fn list_recommendations(&self) -> StateResult<Vec<PolicyRecommendation>>;

    fn put_recommendation(&self, rec: &PolicyRecommendation) -> StateResult<()>;
}

/// Next version for a write over `existing`.
pub(crate) fn next_version(existing: Option<&AutoscalerResource>) -> u64 {
    existing.map_or(1, |r| r.resource_version + 1)
}

/// Find a policy other than `candidate` holding the same risk index.
pub(crate) fn risk_index_holder<'a>(
    existing: impl IntoIterator<Item = &'a Policy>,
    candidate: &Policy,
) -> Option<&'a Policy> {
    existing
        .into_iter()
        .find(|p| p.risk_index == candidate.risk_index && p.name != candidate.name)
}
