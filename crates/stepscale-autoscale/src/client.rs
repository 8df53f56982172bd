//! The autoscaler capability shared by every backend kind.

use std::fmt;

use stepscale_state::{
    AutoscalerKind, AutoscalerRegistry, AutoscalerResource, Labels, OpContext, WorkloadRef,
};

use crate::error::ReconcileResult;
use crate::reconciler::AutoscalerReconciler;

/// What `create_or_update` did to converge the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Created,
    Updated,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Created => f.write_str("created"),
            Operation::Updated => f.write_str("updated"),
        }
    }
}

/// Converges one autoscaler resource per workload to desired bounds.
///
/// Implementations keep no local state; concurrent calls for different
/// workloads are independent, and calls for the same workload are
/// serialized by the registry's version check.
pub trait AutoscalerClient: Send + Sync {
    /// Backend variant this client manages.
    fn resource_kind(&self) -> AutoscalerKind;

    fn max_replica_count(&self, resource: &AutoscalerResource) -> u32 {
        resource.max_replicas
    }

    fn scale_target_name<'a>(&self, resource: &'a AutoscalerResource) -> &'a str {
        &resource.scale_target_ref.name
    }

    /// Look up the resource bound to `workload`, if any.
    fn find(
        &self,
        ctx: &OpContext,
        workload: &WorkloadRef,
    ) -> ReconcileResult<Option<AutoscalerResource>>;

    /// Create the workload's resource, or update its bounds and labels in place.
    fn create_or_update(
        &self,
        ctx: &OpContext,
        workload: &WorkloadRef,
        labels: &Labels,
        max: u32,
        min: u32,
        target_metric_value: u32,
    ) -> ReconcileResult<Operation>;

    /// Remove the resource. Already absent counts as success.
    fn delete(&self, ctx: &OpContext, resource: &AutoscalerResource) -> ReconcileResult<()>;
}

/// Client for the backend `kind`, writing through `registry`.
pub fn client_for<R>(kind: AutoscalerKind, registry: R) -> Box<dyn AutoscalerClient>
where
    R: AutoscalerRegistry + 'static,
{
    Box::new(AutoscalerReconciler::new(kind, registry))
}
