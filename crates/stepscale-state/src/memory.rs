//! MemoryRegistry: in-process fake of the registry contract.
//!
//! Behaves like [`StateStore`](crate::StateStore) (versioned autoscaler
//! writes, duplicate risk-index rejection) and adds failure injection so
//! callers can exercise `Unavailable` paths without a real backend.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{StateError, StateResult};
use crate::registry::*;
use crate::types::*;

#[derive(Default)]
struct Inner {
    policies: BTreeMap<String, Policy>,
    recommendations: BTreeMap<String, PolicyRecommendation>,
    autoscalers: BTreeMap<String, AutoscalerResource>,
    fail_reads: bool,
    fail_writes: bool,
    race_next_update: bool,
    writes: u64,
}

/// Shared in-memory registry. Clones observe the same state.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with policies, bypassing admission checks.
    pub fn with_policies(policies: impl IntoIterator<Item = Policy>) -> Self {
        let registry = Self::new();
        if let Ok(mut inner) = registry.inner.lock() {
            for policy in policies {
                inner.policies.insert(policy.name.clone(), policy);
            }
        }
        registry
    }

    /// Make every read fail with `Unavailable`.
    pub fn fail_reads(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_reads = fail;
        }
    }

    /// Make every write fail with `Unavailable`.
    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_writes = fail;
        }
    }

    /// Let another writer bump the stored version right before the next
    /// autoscaler update, so that update loses the race.
    pub fn race_next_update(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.race_next_update = true;
        }
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.inner.lock().map_or(0, |inner| inner.writes)
    }

    /// Admit a policy, rejecting a reused risk index.
    pub fn put_policy(&self, policy: &Policy) -> StateResult<()> {
        let mut inner = self.write()?;
        if let Some(holder) = risk_index_holder(inner.policies.values(), policy) {
            return Err(StateError::DuplicateRiskIndex {
                name: policy.name.clone(),
                risk_index: policy.risk_index,
                existing: holder.name.clone(),
            });
        }
        inner.policies.insert(policy.name.clone(), policy.clone());
        inner.writes += 1;
        Ok(())
    }

    fn lock(&self) -> StateResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StateError::Unavailable("registry lock poisoned".to_string()))
    }

    fn read(&self) -> StateResult<MutexGuard<'_, Inner>> {
        let inner = self.lock()?;
        if inner.fail_reads {
            return Err(StateError::Unavailable("injected read failure".to_string()));
        }
        Ok(inner)
    }

    fn write(&self) -> StateResult<MutexGuard<'_, Inner>> {
        let inner = self.lock()?;
        if inner.fail_writes {
            return Err(StateError::Unavailable("injected write failure".to_string()));
        }
        Ok(inner)
    }
}

impl PolicySource for MemoryRegistry {
    fn list_policies(&self) -> StateResult<Vec<Policy>> {
        Ok(self.read()?.policies.values().cloned().collect())
    }

    fn get_policy(&self, name: &str) -> StateResult<Option<Policy>> {
        Ok(self.read()?.policies.get(name).cloned())
    }
}

impl RecommendationRegistry for MemoryRegistry {
    fn get_recommendation(&self, key: &str) -> StateResult<Option<PolicyRecommendation>> {
        Ok(self.read()?.recommendations.get(key).cloned())
    }

    fn list_recommendations(&self) -> StateResult<Vec<PolicyRecommendation>> {
        Ok(self.read()?.recommendations.values().cloned().collect())
    }

    fn put_recommendation(&self, rec: &PolicyRecommendation) -> StateResult<()> {
        let mut inner = self.write()?;
        inner.recommendations.insert(rec.table_key(), rec.clone());
        inner.writes += 1;
        Ok(())
    }
}

impl AutoscalerRegistry for MemoryRegistry {
    fn get_autoscaler(&self, key: &str) -> StateResult<Option<AutoscalerResource>> {
        Ok(self.read()?.autoscalers.get(key).cloned())
    }

    fn create_autoscaler(
        &self,
        resource: &AutoscalerResource,
    ) -> StateResult<AutoscalerResource> {
        let mut inner = self.write()?;
        let key = resource.table_key();
        if inner.autoscalers.contains_key(&key) {
            return Err(StateError::AlreadyExists(key));
        }
        let mut stored = resource.clone();
        stored.resource_version = next_version(None);
        inner.autoscalers.insert(key, stored.clone());
        inner.writes += 1;
        Ok(stored)
    }

    fn update_autoscaler(
        &self,
        resource: &AutoscalerResource,
    ) -> StateResult<AutoscalerResource> {
        let mut inner = self.write()?;
        let key = resource.table_key();
        if std::mem::take(&mut inner.race_next_update)
            && let Some(raced) = inner.autoscalers.get_mut(&key)
        {
            raced.resource_version += 1;
        }
        let current = inner
            .autoscalers
            .get(&key)
            .ok_or_else(|| StateError::NotFound(key.clone()))?;
        if current.resource_version != resource.resource_version {
            return Err(StateError::Conflict {
                key,
                expected: resource.resource_version,
                actual: current.resource_version,
            });
        }
        let mut stored = resource.clone();
        stored.resource_version = next_version(Some(current));
        inner.autoscalers.insert(key, stored.clone());
        inner.writes += 1;
        Ok(stored)
    }

    fn delete_autoscaler(&self, key: &str) -> StateResult<bool> {
        let mut inner = self.write()?;
        let existed = inner.autoscalers.remove(key).is_some();
        if existed {
            inner.writes += 1;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = MemoryRegistry::new();
        let b = a.clone();
        a.put_policy(&Policy::new("safe", 1)).unwrap();

        assert_eq!(b.list_policies().unwrap().len(), 1);
    }

    #[test]
    fn seeding_bypasses_duplicate_check() {
        let reg = MemoryRegistry::with_policies([Policy::new("a", 3), Policy::new("b", 3)]);
        assert_eq!(reg.list_policies().unwrap().len(), 2);

        let err = reg.put_policy(&Policy::new("c", 3)).unwrap_err();
        assert!(matches!(err, StateError::DuplicateRiskIndex { .. }));
    }

    #[test]
    fn injected_failures() {
        let reg = MemoryRegistry::with_policies([Policy::new("a", 1)]);

        reg.fail_reads(true);
        assert!(matches!(reg.list_policies(), Err(StateError::Unavailable(_))));
        reg.fail_reads(false);
        assert!(reg.list_policies().is_ok());

        reg.fail_writes(true);
        assert!(reg.delete_autoscaler("hpa:default/x").is_err());
        assert_eq!(reg.write_count(), 0);
    }

    #[test]
    fn raced_update_conflicts_once() {
        let reg = MemoryRegistry::new();
        let mut res = AutoscalerResource {
            kind: AutoscalerKind::Hpa,
            namespace: "default".to_string(),
            name: "api".to_string(),
            scale_target_ref: ScaleTargetRef {
                name: "api".to_string(),
                kind: "Deployment".to_string(),
            },
            min_replicas: 2,
            max_replicas: 10,
            target_metric_value: 60,
            target_type: TargetType::Utilization,
            labels: Labels::new(),
            resource_version: 0,
            created_at: 1000,
            updated_at: 1000,
        };
        res = reg.create_autoscaler(&res).unwrap();

        reg.race_next_update();
        res.max_replicas = 20;
        let err = reg.update_autoscaler(&res).unwrap_err();
        assert!(matches!(err, StateError::Conflict { expected: 1, actual: 2, .. }));
        let stored = reg.get_autoscaler(&res.table_key()).unwrap().unwrap();
        assert_eq!(stored.max_replicas, 10);

        res.resource_version = stored.resource_version;
        assert_eq!(reg.update_autoscaler(&res).unwrap().resource_version, 3);
    }
}
