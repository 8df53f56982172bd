//! Recommendation controller: executes queued recommendations.
//!
//! For each queued recommendation the controller:
//!
//! 1. asks the [`PolicyLadder`] whether the recommended policy is one
//!    ladder step from the currently applied one,
//! 2. asks the [`AutoscalerClient`] to converge the workload's autoscaler
//!    to the target bounds,
//! 3. marks the recommendation Executed, or appends a failure condition
//!    and leaves it Queued for the next pass.
//!
//! Neither collaborator retries. A failed recommendation is picked up
//! again on the next pass; one failing workload never stops the others.

use std::time::Duration;

use stepscale_autoscale::{AutoscalerClient, Operation};
use stepscale_policy::{LadderError, LadderStep, PolicyLadder};
use stepscale_state::*;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{RecommendError, RecommendResult};
use crate::lifecycle::{RecommendationLifecycle, reason};

/// Outcome counts of one controller pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub executed: u32,
    pub failed: u32,
}

/// Drives recommendations from Queued to Executed.
pub struct RecommendationController<S> {
    store: S,
    ladder: PolicyLadder<S>,
    client: Box<dyn AutoscalerClient>,
    /// Labels stamped on every autoscaler the controller writes.
    labels: Labels,
    /// Upper bound on a single `execute`.
    op_timeout: Option<Duration>,
}

impl<S> RecommendationController<S>
where
    S: PolicySource + RecommendationRegistry + Clone,
{
    pub fn new(store: S, client: Box<dyn AutoscalerClient>) -> Self {
        Self {
            ladder: PolicyLadder::new(store.clone()),
            store,
            client,
            labels: Labels::new(),
            op_timeout: None,
        }
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = Some(timeout);
        self
    }

    fn op_context(&self, ctx: &OpContext) -> OpContext {
        match self.op_timeout {
            Some(timeout) => ctx.clone().with_timeout(timeout),
            None => ctx.clone(),
        }
    }

    /// Fetch the recommendation for a workload.
    pub fn recommendation(
        &self,
        ctx: &OpContext,
        workload: &WorkloadRef,
    ) -> RecommendResult<PolicyRecommendation> {
        ctx.check()?;
        self.store
            .get_recommendation(&workload.table_key())
            .map_err(|source| RecommendError::StoreUnavailable { op: "get", source })?
            .ok_or_else(|| RecommendError::NotFound(workload.to_string()))
    }

    fn save(&self, ctx: &OpContext, rec: &PolicyRecommendation) -> RecommendResult<()> {
        ctx.check()?;
        self.store
            .put_recommendation(rec)
            .map_err(|source| RecommendError::StoreUnavailable { op: "put", source })
    }

    /// Store a freshly generated recommendation.
    ///
    /// An unexecuted recommendation already stored for the workload is
    /// superseded and returned. When the new one does not say what is
    /// currently applied, that is carried over from the stored one.
    pub fn submit(
        &self,
        ctx: &OpContext,
        mut rec: PolicyRecommendation,
    ) -> RecommendResult<Option<PolicyRecommendation>> {
        if rec.phase() != RecommendationPhase::Generated {
            return Err(RecommendError::InvalidTransition {
                workload: rec.workload.to_string(),
                from: rec.phase(),
                to: RecommendationPhase::Generated,
            });
        }
        ctx.check()?;
        let previous = self
            .store
            .get_recommendation(&rec.table_key())
            .map_err(|source| RecommendError::StoreUnavailable { op: "get", source })?;

        let mut superseded = None;
        if let Some(mut prev) = previous {
            if rec.current_policy.is_none() {
                rec.current_policy = prev.current_policy.clone();
                rec.current_hpa_config = prev.current_hpa_config;
            }
            if !prev.phase().is_terminal() {
                prev.supersede(epoch_secs(), &rec.policy)?;
                superseded = Some(prev);
            }
        }

        self.save(ctx, &rec)?;
        info!(
            workload = %rec.workload,
            policy = %rec.policy,
            superseded = superseded.is_some(),
            "recommendation submitted"
        );
        Ok(superseded)
    }

    /// Queue the workload's recommendation for execution.
    pub fn queue(
        &self,
        ctx: &OpContext,
        workload: &WorkloadRef,
    ) -> RecommendResult<PolicyRecommendation> {
        let mut rec = self.recommendation(ctx, workload)?;
        rec.queue(epoch_secs())?;
        self.save(ctx, &rec)?;
        Ok(rec)
    }

    /// Validate and apply the workload's queued recommendation.
    ///
    /// The configured op timeout bounds the ladder check and the apply
    /// only. Running out of it is an ordinary failure and is recorded.
    /// Cancellation or expiry of `ctx` itself records nothing.
    pub fn execute(&self, ctx: &OpContext, workload: &WorkloadRef) -> RecommendResult<Operation> {
        let mut rec = self.recommendation(ctx, workload)?;
        if rec.phase() != RecommendationPhase::Queued {
            return Err(RecommendError::InvalidTransition {
                workload: workload.to_string(),
                from: rec.phase(),
                to: RecommendationPhase::Executed,
            });
        }

        match self.apply(&self.op_context(ctx), &rec) {
            Ok((step, op)) => {
                let message = format!(
                    "{op} {} via {step} step to policy {}",
                    self.client.resource_kind(),
                    rec.policy
                );
                rec.mark_executed(epoch_secs(), &message)?;
                self.save(ctx, &rec)?;
                Ok(op)
            }
            Err(err) => {
                if err.is_interrupted() && ctx.check().is_err() {
                    return Err(err);
                }
                rec.mark_failed(epoch_secs(), failure_reason(&err), &err.to_string())?;
                if let Err(save_err) = self.save(ctx, &rec) {
                    warn!(%workload, error = %save_err, "failed to record execution failure");
                }
                Err(err)
            }
        }
    }

    fn apply(
        &self,
        ctx: &OpContext,
        rec: &PolicyRecommendation,
    ) -> RecommendResult<(LadderStep, Operation)> {
        let step = self
            .ladder
            .step_between(ctx, rec.current_policy.as_deref(), &rec.policy)?;
        let target = rec.target_hpa_config;
        let op = self.client.create_or_update(
            ctx,
            &rec.workload,
            &self.labels,
            target.max,
            target.min,
            target.target_metric_value,
        )?;
        Ok((step, op))
    }

    /// Execute every queued recommendation once.
    ///
    /// Per-workload failures are counted and logged. The pass stops early
    /// only when `ctx` is cancelled or expires.
    pub fn run_once(&self, ctx: &OpContext) -> RecommendResult<PassSummary> {
        ctx.check()?;
        let recs = self
            .store
            .list_recommendations()
            .map_err(|source| RecommendError::StoreUnavailable { op: "list", source })?;

        let mut summary = PassSummary::default();
        for rec in recs
            .iter()
            .filter(|r| r.phase() == RecommendationPhase::Queued)
        {
            match self.execute(ctx, &rec.workload) {
                Ok(_) => summary.executed += 1,
                Err(e) if e.is_interrupted() && ctx.check().is_err() => return Err(e),
                Err(e) => {
                    summary.failed += 1;
                    warn!(workload = %rec.workload, error = %e, "recommendation not executed");
                }
            }
        }
        debug!(executed = summary.executed, failed = summary.failed, "controller pass finished");
        Ok(summary)
    }

    /// Run the controller loop until `shutdown` flips.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = interval.as_secs(),
            kind = %self.client.resource_kind(),
            "recommendation controller started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let ctx = OpContext::background().with_cancel(shutdown.clone());
                    match self.run_once(&ctx) {
                        Ok(summary) if summary != PassSummary::default() => {
                            info!(
                                executed = summary.executed,
                                failed = summary.failed,
                                "controller pass complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "controller pass failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("recommendation controller shutting down");
                    break;
                }
            }
        }
    }
}

/// Condition reason recorded for a failed execution.
fn failure_reason(err: &RecommendError) -> &'static str {
    if err.is_interrupted() {
        return reason::TIMED_OUT;
    }
    match err {
        RecommendError::Ladder(LadderError::StoreUnavailable { .. }) => {
            reason::POLICY_STORE_UNAVAILABLE
        }
        RecommendError::Ladder(_) => reason::LADDER_STEP_REJECTED,
        RecommendError::Reconcile(e) if e.is_conflict() => reason::CONFLICT,
        _ => reason::APPLY_FAILED,
    }
}
