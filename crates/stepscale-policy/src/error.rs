//! Error types for ladder queries.

use stepscale_state::{Interrupted, StateError};
use thiserror::Error;

/// Result type alias for ladder operations.
pub type LadderResult<T> = Result<T, LadderError>;

#[derive(Debug, Error)]
pub enum LadderError {
    #[error("policy not found: {0}")]
    NotFound(String),

    #[error("no policies defined")]
    EmptyPolicySet,

    #[error("no policy above {0} on the ladder")]
    NoNextPolicy(String),

    #[error("no policy below {0} on the ladder")]
    NoPreviousPolicy(String),

    /// The target is not one ladder step away from the current policy.
    #[error("{to} is not a single ladder step from {from:?}")]
    MultiStep { from: Option<String>, to: String },

    #[error("policy store unavailable during {op}: {source}")]
    StoreUnavailable {
        op: &'static str,
        #[source]
        source: StateError,
    },

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}
