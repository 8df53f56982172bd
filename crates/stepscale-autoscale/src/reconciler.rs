//! AutoscalerReconciler: registry-backed [`AutoscalerClient`].
//!
//! The resource for a workload shares its name and namespace and points
//! `scale_target_ref` back at it. Backends differ only in how the target
//! metric is expressed and how low `min` may go:
//!
//! ```text
//! hpa           target = utilization %     min >= 1
//! scaledobject  target = average value     min >= 0 (scale-to-zero)
//! ```
//!
//! A write is a single registry transaction carrying the version that was
//! read. A lost race surfaces as `Conflict`; retrying is the caller's call.

use stepscale_state::*;
use tracing::{debug, info};

use crate::client::{AutoscalerClient, Operation};
use crate::error::{ReconcileError, ReconcileResult};

/// Converges autoscaler resources of one backend kind.
#[derive(Clone)]
pub struct AutoscalerReconciler<R> {
    kind: AutoscalerKind,
    registry: R,
}

impl<R: AutoscalerRegistry> AutoscalerReconciler<R> {
    pub fn new(kind: AutoscalerKind, registry: R) -> Self {
        Self { kind, registry }
    }

    fn target_type(&self) -> TargetType {
        match self.kind {
            AutoscalerKind::Hpa => TargetType::Utilization,
            AutoscalerKind::ScaledObject => TargetType::AverageValue,
        }
    }

    fn min_floor(&self) -> u32 {
        match self.kind {
            AutoscalerKind::Hpa => 1,
            AutoscalerKind::ScaledObject => 0,
        }
    }

    fn key_for(&self, workload: &WorkloadRef) -> String {
        autoscaler_key(self.kind, &workload.namespace, &workload.name)
    }

    fn check_bounds(&self, workload: &WorkloadRef, min: u32, max: u32) -> ReconcileResult<()> {
        let reason = if min > max {
            format!("min {min} exceeds max {max}")
        } else if min < self.min_floor() {
            format!("{} requires min >= {}, got {min}", self.kind, self.min_floor())
        } else {
            return Ok(());
        };
        Err(ReconcileError::InvalidBounds {
            workload: workload.to_string(),
            reason,
        })
    }
}

impl<R: AutoscalerRegistry> AutoscalerClient for AutoscalerReconciler<R> {
    fn resource_kind(&self) -> AutoscalerKind {
        self.kind
    }

    fn find(
        &self,
        ctx: &OpContext,
        workload: &WorkloadRef,
    ) -> ReconcileResult<Option<AutoscalerResource>> {
        ctx.check()?;
        self.registry
            .get_autoscaler(&self.key_for(workload))
            .map_err(|source| ReconcileError::BackendUnavailable { op: "get", source })
    }

    fn create_or_update(
        &self,
        ctx: &OpContext,
        workload: &WorkloadRef,
        labels: &Labels,
        max: u32,
        min: u32,
        target_metric_value: u32,
    ) -> ReconcileResult<Operation> {
        self.check_bounds(workload, min, max)?;
        let key = self.key_for(workload);
        let existing = self.find(ctx, workload)?;
        let now = epoch_secs();
        let scale_target_ref = ScaleTargetRef {
            name: workload.name.clone(),
            kind: workload.kind.clone(),
        };

        let Some(current) = existing else {
            let resource = AutoscalerResource {
                kind: self.kind,
                namespace: workload.namespace.clone(),
                name: workload.name.clone(),
                scale_target_ref,
                min_replicas: min,
                max_replicas: max,
                target_metric_value,
                target_type: self.target_type(),
                labels: labels.clone(),
                resource_version: 0,
                created_at: now,
                updated_at: now,
            };
            ctx.check()?;
            self.registry
                .create_autoscaler(&resource)
                .map_err(|e| ReconcileError::from_write("create", &key, e))?;
            info!(%key, min, max, target = target_metric_value, "autoscaler created");
            return Ok(Operation::Created);
        };

        let mut desired = current.clone();
        desired.scale_target_ref = scale_target_ref;
        desired.min_replicas = min;
        desired.max_replicas = max;
        desired.target_metric_value = target_metric_value;
        desired.target_type = self.target_type();
        desired.labels.extend(labels.clone());

        if desired == current {
            debug!(%key, "autoscaler already converged");
            return Ok(Operation::Updated);
        }

        desired.updated_at = now;
        ctx.check()?;
        let stored = self
            .registry
            .update_autoscaler(&desired)
            .map_err(|e| ReconcileError::from_write("update", &key, e))?;
        info!(
            %key,
            min,
            max,
            target = target_metric_value,
            version = stored.resource_version,
            "autoscaler updated"
        );
        Ok(Operation::Updated)
    }

    fn delete(&self, ctx: &OpContext, resource: &AutoscalerResource) -> ReconcileResult<()> {
        let key = resource.table_key();
        if resource.kind != self.kind {
            return Err(ReconcileError::WrongKind {
                kind: self.kind,
                key,
            });
        }
        ctx.check()?;
        let existed = self
            .registry
            .delete_autoscaler(&key)
            .map_err(|source| ReconcileError::BackendUnavailable { op: "delete", source })?;
        if existed {
            info!(%key, "autoscaler deleted");
        } else {
            debug!(%key, "autoscaler already absent");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::client_for;
    use tokio::sync::watch;

    fn ctx() -> OpContext {
        OpContext::background()
    }

    fn labels() -> Labels {
        Labels::from([("created-by".to_string(), "stepscale".to_string())])
    }

    fn svc() -> WorkloadRef {
        WorkloadRef::deployment("default", "svc")
    }

    fn hpa(reg: &MemoryRegistry) -> AutoscalerReconciler<MemoryRegistry> {
        AutoscalerReconciler::new(AutoscalerKind::Hpa, reg.clone())
    }

    #[test]
    fn creates_then_updates() {
        let reg = MemoryRegistry::new();
        let client = hpa(&reg);

        let op = client.create_or_update(&ctx(), &svc(), &labels(), 10, 5, 4).unwrap();
        assert_eq!(op, Operation::Created);
        let res = client.find(&ctx(), &svc()).unwrap().unwrap();
        assert_eq!(res.bounds(), HpaConfiguration::new(5, 10, 4));
        assert_eq!(client.scale_target_name(&res), "svc");
        assert_eq!(res.scale_target_ref.kind, "Deployment");

        let op = client.create_or_update(&ctx(), &svc(), &labels(), 8, 5, 10).unwrap();
        assert_eq!(op, Operation::Updated);
        let res = client.find(&ctx(), &svc()).unwrap().unwrap();
        assert_eq!(client.max_replica_count(&res), 8);
        assert_eq!(res.min_replicas, 5);
        assert_eq!(res.target_metric_value, 10);
    }

    #[test]
    fn identical_calls_converge_to_same_state() {
        let reg = MemoryRegistry::new();
        let client = hpa(&reg);

        let first = client.create_or_update(&ctx(), &svc(), &labels(), 10, 2, 60).unwrap();
        let after_first = client.find(&ctx(), &svc()).unwrap();
        let writes = reg.write_count();

        let second = client.create_or_update(&ctx(), &svc(), &labels(), 10, 2, 60).unwrap();
        let after_second = client.find(&ctx(), &svc()).unwrap();

        assert_eq!((first, second), (Operation::Created, Operation::Updated));
        assert_eq!(after_first, after_second);
        assert_eq!(reg.write_count(), writes);
    }

    #[test]
    fn update_merges_labels() {
        let reg = MemoryRegistry::new();
        let client = hpa(&reg);
        client.create_or_update(&ctx(), &svc(), &labels(), 10, 2, 60).unwrap();

        let extra = Labels::from([("team".to_string(), "payments".to_string())]);
        client.create_or_update(&ctx(), &svc(), &extra, 10, 2, 60).unwrap();

        let res = client.find(&ctx(), &svc()).unwrap().unwrap();
        assert_eq!(res.labels.get("created-by").map(String::as_str), Some("stepscale"));
        assert_eq!(res.labels.get("team").map(String::as_str), Some("payments"));
    }

    #[test]
    fn rejects_min_above_max() {
        let reg = MemoryRegistry::new();
        let err = hpa(&reg)
            .create_or_update(&ctx(), &svc(), &labels(), 3, 5, 50)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidBounds { .. }));
        assert_eq!(reg.write_count(), 0);
    }

    #[test]
    fn hpa_requires_one_replica_but_scaled_object_allows_zero() {
        let reg = MemoryRegistry::new();
        assert!(matches!(
            hpa(&reg).create_or_update(&ctx(), &svc(), &labels(), 3, 0, 50),
            Err(ReconcileError::InvalidBounds { .. })
        ));

        let scaled = AutoscalerReconciler::new(AutoscalerKind::ScaledObject, reg.clone());
        let op = scaled.create_or_update(&ctx(), &svc(), &labels(), 3, 0, 50).unwrap();
        assert_eq!(op, Operation::Created);
        let res = scaled.find(&ctx(), &svc()).unwrap().unwrap();
        assert_eq!(res.target_type, TargetType::AverageValue);
    }

    #[test]
    fn backends_do_not_share_resources() {
        let reg = MemoryRegistry::new();
        let scaled = client_for(AutoscalerKind::ScaledObject, reg.clone());
        let native = client_for(AutoscalerKind::Hpa, reg.clone());
        assert_eq!(native.resource_kind(), AutoscalerKind::Hpa);

        native.create_or_update(&ctx(), &svc(), &labels(), 4, 1, 70).unwrap();
        assert!(scaled.find(&ctx(), &svc()).unwrap().is_none());
        let op = scaled.create_or_update(&ctx(), &svc(), &labels(), 4, 1, 70).unwrap();
        assert_eq!(op, Operation::Created);
    }

    #[test]
    fn delete_is_idempotent() {
        let reg = MemoryRegistry::new();
        let client = hpa(&reg);
        client.create_or_update(&ctx(), &svc(), &labels(), 10, 2, 60).unwrap();
        let res = client.find(&ctx(), &svc()).unwrap().unwrap();

        client.delete(&ctx(), &res).unwrap();
        client.delete(&ctx(), &res).unwrap();
        assert!(client.find(&ctx(), &svc()).unwrap().is_none());
    }

    #[test]
    fn backend_failure_is_reported() {
        let reg = MemoryRegistry::new();
        let client = hpa(&reg);

        reg.fail_writes(true);
        let err = client
            .create_or_update(&ctx(), &svc(), &labels(), 10, 2, 60)
            .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::BackendUnavailable { op: "create", .. }
        ));
        reg.fail_writes(false);
        assert!(client.find(&ctx(), &svc()).unwrap().is_none());

        reg.fail_reads(true);
        assert!(matches!(
            client.create_or_update(&ctx(), &svc(), &labels(), 10, 2, 60),
            Err(ReconcileError::BackendUnavailable { op: "get", .. })
        ));
    }

    #[test]
    fn failed_update_leaves_prior_resource() {
        let reg = MemoryRegistry::new();
        let client = hpa(&reg);
        client.create_or_update(&ctx(), &svc(), &labels(), 10, 2, 60).unwrap();

        reg.fail_writes(true);
        assert!(client.create_or_update(&ctx(), &svc(), &labels(), 20, 4, 80).is_err());
        reg.fail_writes(false);

        let res = client.find(&ctx(), &svc()).unwrap().unwrap();
        assert_eq!(res.bounds(), HpaConfiguration::new(2, 10, 60));
    }

    #[test]
    fn racing_writer_surfaces_conflict() {
        let reg = MemoryRegistry::new();
        let client = hpa(&reg);
        client.create_or_update(&ctx(), &svc(), &labels(), 10, 2, 60).unwrap();
        let before = client.find(&ctx(), &svc()).unwrap().unwrap();

        reg.race_next_update();
        let err = client
            .create_or_update(&ctx(), &svc(), &labels(), 20, 4, 80)
            .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Conflict {
                ref key,
                source: StateError::Conflict { .. },
            } if key == "hpa:default/svc"
        ));
        assert!(err.is_conflict());

        let after = client.find(&ctx(), &svc()).unwrap().unwrap();
        assert_eq!(after.bounds(), before.bounds());
        assert_eq!(after.labels, before.labels);

        // A retry reads the new version and goes through.
        let op = client.create_or_update(&ctx(), &svc(), &labels(), 20, 4, 80).unwrap();
        assert_eq!(op, Operation::Updated);
        assert_eq!(
            client.find(&ctx(), &svc()).unwrap().unwrap().bounds(),
            HpaConfiguration::new(4, 20, 80)
        );
    }

    #[test]
    fn delete_rejects_other_backend_kind() {
        let reg = MemoryRegistry::new();
        let scaled = AutoscalerReconciler::new(AutoscalerKind::ScaledObject, reg.clone());
        scaled.create_or_update(&ctx(), &svc(), &labels(), 6, 0, 30).unwrap();
        let res = scaled.find(&ctx(), &svc()).unwrap().unwrap();

        let err = hpa(&reg).delete(&ctx(), &res).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::WrongKind { kind: AutoscalerKind::Hpa, .. }
        ));
        assert!(scaled.find(&ctx(), &svc()).unwrap().is_some());

        scaled.delete(&ctx(), &res).unwrap();
        assert!(scaled.find(&ctx(), &svc()).unwrap().is_none());
    }

    #[test]
    fn cancelled_context_prevents_mutation() {
        let reg = MemoryRegistry::new();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let cancelled = OpContext::background().with_cancel(rx);

        let err = hpa(&reg)
            .create_or_update(&cancelled, &svc(), &labels(), 10, 2, 60)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Interrupted(Interrupted::Cancelled)));
        assert_eq!(reg.write_count(), 0);
    }

    #[test]
    fn works_over_redb_store() {
        let store = StateStore::open_in_memory().unwrap();
        let client = client_for(AutoscalerKind::Hpa, store.clone());

        assert_eq!(
            client.create_or_update(&ctx(), &svc(), &labels(), 10, 5, 4).unwrap(),
            Operation::Created
        );
        assert_eq!(
            client.create_or_update(&ctx(), &svc(), &labels(), 8, 5, 10).unwrap(),
            Operation::Updated
        );
        let res = store.get_autoscaler("hpa:default/svc").unwrap().unwrap();
        assert_eq!(res.bounds(), HpaConfiguration::new(5, 8, 10));
        assert_eq!(res.resource_version, 2);
    }
}
