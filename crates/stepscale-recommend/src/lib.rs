//! stepscale-recommend: recommendation lifecycle and execution.
//!
//! A recommendation proposes moving one workload to a policy's bounds.
//! It is born Generated, gets Queued, and ends Executed, or Superseded
//! when a newer recommendation for the same workload arrives first.
//!
//! # Components
//!
//! - **`lifecycle`**: state machine and status conditions
//! - **`controller`**: validates single-rung ladder moves, applies bounds
//!   through the autoscaler reconciler, records the outcome

pub mod controller;
pub mod error;
pub mod lifecycle;

pub use controller::{PassSummary, RecommendationController};
pub use error::{RecommendError, RecommendResult};
pub use lifecycle::{MAX_CONDITIONS, RecommendationLifecycle};
