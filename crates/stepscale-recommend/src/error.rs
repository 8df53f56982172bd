//! Error types for recommendation handling.

use stepscale_autoscale::ReconcileError;
use stepscale_policy::LadderError;
use stepscale_state::{Interrupted, RecommendationPhase, StateError};
use thiserror::Error;

/// Result type alias for recommendation operations.
pub type RecommendResult<T> = Result<T, RecommendError>;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("no recommendation for workload {0}")]
    NotFound(String),

    #[error("recommendation for {workload} cannot move from {from} to {to}")]
    InvalidTransition {
        workload: String,
        from: RecommendationPhase,
        to: RecommendationPhase,
    },

    #[error("recommendation store unavailable during {op}: {source}")]
    StoreUnavailable {
        op: &'static str,
        #[source]
        source: StateError,
    },

    #[error(transparent)]
    Ladder(#[from] LadderError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl RecommendError {
    /// True when the operation stopped on a cancellation or deadline.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            RecommendError::Interrupted(_)
                | RecommendError::Ladder(LadderError::Interrupted(_))
                | RecommendError::Reconcile(ReconcileError::Interrupted(_))
        )
    }
}
