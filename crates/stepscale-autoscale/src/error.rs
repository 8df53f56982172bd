//! Error types for the autoscaler reconciler.

use stepscale_state::{AutoscalerKind, Interrupted, StateError};
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("autoscaler backend unavailable during {op}: {source}")]
    BackendUnavailable {
        op: &'static str,
        #[source]
        source: StateError,
    },

    /// Another writer changed the resource between read and write.
    #[error("conflicting write to autoscaler {key}")]
    Conflict {
        key: String,
        #[source]
        source: StateError,
    },

    #[error("invalid bounds for {workload}: {reason}")]
    InvalidBounds { workload: String, reason: String },

    /// The resource belongs to a different backend than this client.
    #[error("{kind} client cannot manage {key}")]
    WrongKind { kind: AutoscalerKind, key: String },

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl ReconcileError {
    /// Map a registry error, separating races from transport failures.
    pub(crate) fn from_write(op: &'static str, key: &str, source: StateError) -> Self {
        match source {
            StateError::Conflict { .. }
            | StateError::AlreadyExists(_)
            | StateError::NotFound(_) => ReconcileError::Conflict {
                key: key.to_string(),
                source,
            },
            source => ReconcileError::BackendUnavailable { op, source },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Conflict { .. })
    }
}
