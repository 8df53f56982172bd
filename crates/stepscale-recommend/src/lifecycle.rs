//! Recommendation lifecycle: drives the recommendation state machine.
//!
//! ```text
//! Generated ──queue──▶ Queued ──mark_executed──▶ Executed
//!     │                  │  ▲
//!     │                  └──┘ mark_failed (stays Queued)
//!     └──────┬───────────┘
//!         supersede
//!            ▼
//!       Superseded
//! ```
//!
//! Every transition appends a status condition. The list is append-only
//! and keeps the most recent [`MAX_CONDITIONS`] entries.

use stepscale_state::{Condition, ConditionStatus, PolicyRecommendation, RecommendationPhase};
use tracing::{debug, info, warn};

use crate::error::{RecommendError, RecommendResult};

/// Conditions kept per recommendation.
pub const MAX_CONDITIONS: usize = 16;

/// Condition types written by the lifecycle.
pub mod condition {
    pub const QUEUED: &str = "Queued";
    pub const EXECUTED: &str = "Executed";
    pub const SUPERSEDED: &str = "Superseded";
}

/// Condition reasons written by the lifecycle and the controller.
pub mod reason {
    pub const QUEUED_FOR_EXECUTION: &str = "QueuedForExecution";
    pub const APPLIED: &str = "AutoscalerApplied";
    pub const LADDER_STEP_REJECTED: &str = "LadderStepRejected";
    pub const POLICY_STORE_UNAVAILABLE: &str = "PolicyStoreUnavailable";
    pub const APPLY_FAILED: &str = "AutoscalerApplyFailed";
    pub const CONFLICT: &str = "AutoscalerConflict";
    pub const TIMED_OUT: &str = "ExecutionTimedOut";
    pub const NEWER_RECOMMENDATION: &str = "NewerRecommendation";
}

/// State transitions on a [`PolicyRecommendation`].
pub trait RecommendationLifecycle {
    /// Generated → Queued.
    fn queue(&mut self, now: u64) -> RecommendResult<()>;

    /// Queued → Executed. The target becomes the current configuration.
    fn mark_executed(&mut self, now: u64, message: &str) -> RecommendResult<()>;

    /// Record a failed execution. The recommendation stays Queued.
    fn mark_failed(&mut self, now: u64, reason: &str, message: &str) -> RecommendResult<()>;

    /// Generated/Queued → Superseded.
    fn supersede(&mut self, now: u64, by_policy: &str) -> RecommendResult<()>;

    /// Append a condition, dropping the oldest past [`MAX_CONDITIONS`].
    fn push_condition(&mut self, condition: Condition);
}

fn require(
    rec: &PolicyRecommendation,
    allowed: &[RecommendationPhase],
    to: RecommendationPhase,
) -> RecommendResult<()> {
    if allowed.contains(&rec.phase()) {
        return Ok(());
    }
    Err(RecommendError::InvalidTransition {
        workload: rec.workload.to_string(),
        from: rec.phase(),
        to,
    })
}

fn new_condition(
    type_: &str,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    now: u64,
) -> Condition {
    Condition {
        type_: type_.to_string(),
        status,
        reason: reason.to_string(),
        message: message.to_string(),
        last_transition_time: now,
    }
}

impl RecommendationLifecycle for PolicyRecommendation {
    fn queue(&mut self, now: u64) -> RecommendResult<()> {
        require(self, &[RecommendationPhase::Generated], RecommendationPhase::Queued)?;
        self.queued_for_execution = true;
        self.queued_for_execution_at = Some(now);
        self.status.phase = RecommendationPhase::Queued;
        let message = format!("policy {} queued for execution", self.policy);
        self.push_condition(new_condition(
            condition::QUEUED,
            ConditionStatus::True,
            reason::QUEUED_FOR_EXECUTION,
            &message,
            now,
        ));
        info!(workload = %self.workload, policy = %self.policy, "recommendation queued");
        Ok(())
    }

    fn mark_executed(&mut self, now: u64, message: &str) -> RecommendResult<()> {
        require(self, &[RecommendationPhase::Queued], RecommendationPhase::Executed)?;
        self.current_hpa_config = self.target_hpa_config;
        self.current_policy = Some(self.policy.clone());
        self.status.phase = RecommendationPhase::Executed;
        self.push_condition(new_condition(
            condition::EXECUTED,
            ConditionStatus::True,
            reason::APPLIED,
            message,
            now,
        ));
        info!(workload = %self.workload, policy = %self.policy, "recommendation executed");
        Ok(())
    }

    fn mark_failed(&mut self, now: u64, reason: &str, message: &str) -> RecommendResult<()> {
        require(self, &[RecommendationPhase::Queued], RecommendationPhase::Queued)?;
        self.push_condition(new_condition(
            condition::EXECUTED,
            ConditionStatus::False,
            reason,
            message,
            now,
        ));
        warn!(
            workload = %self.workload,
            policy = %self.policy,
            %reason,
            "recommendation execution failed"
        );
        Ok(())
    }

    fn supersede(&mut self, now: u64, by_policy: &str) -> RecommendResult<()> {
        require(
            self,
            &[RecommendationPhase::Generated, RecommendationPhase::Queued],
            RecommendationPhase::Superseded,
        )?;
        self.status.phase = RecommendationPhase::Superseded;
        let message = format!("superseded by a newer recommendation for policy {by_policy}");
        self.push_condition(new_condition(
            condition::SUPERSEDED,
            ConditionStatus::True,
            reason::NEWER_RECOMMENDATION,
            &message,
            now,
        ));
        debug!(workload = %self.workload, policy = %self.policy, "recommendation superseded");
        Ok(())
    }

    fn push_condition(&mut self, condition: Condition) {
        let conditions = &mut self.status.conditions;
        conditions.push(condition);
        if conditions.len() > MAX_CONDITIONS {
            let excess = conditions.len() - MAX_CONDITIONS;
            conditions.drain(..excess);
        }
    }
}
