//! stepscale-policy: the policy ladder.
//!
//! Policies form a total order by `risk_index` (lower is safer). The
//! ladder answers "what is the safest / default / next / previous
//! policy" against the registry, and validates that a recommended policy
//! change moves at most one rung.
//!
//! # Components
//!
//! - **`ordering`**: pure sort and traversal over a given policy set
//! - **`ladder`**: [`PolicyLadder`], the registry-backed query surface

pub mod error;
pub mod ladder;
pub mod ordering;

pub use error::{LadderError, LadderResult};
pub use ladder::PolicyLadder;
pub use ordering::{LadderStep, sort_policies};
