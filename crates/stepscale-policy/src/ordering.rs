//! Pure ordering and traversal over a policy set.
//!
//! Nothing here touches a registry. [`PolicyLadder`](crate::PolicyLadder)
//! feeds every call a freshly listed set, so these functions see the same
//! input a caller would and can be tested without transport.

use std::fmt;

use serde::{Deserialize, Serialize};
use stepscale_state::Policy;

/// Sort ascending by risk index. Equal indexes fall back to name so the
/// result never depends on listing order.
pub fn sort_policies(mut policies: Vec<Policy>) -> Vec<Policy> {
    policies.sort_by(|a, b| {
        a.risk_index
            .cmp(&b.risk_index)
            .then_with(|| a.name.cmp(&b.name))
    });
    policies
}

/// Index of `name` in a sorted ladder.
pub fn position(sorted: &[Policy], name: &str) -> Option<usize> {
    sorted.iter().position(|p| p.name == name)
}

/// Floor of the ladder.
pub fn safest(sorted: &[Policy]) -> Option<&Policy> {
    sorted.first()
}

/// Lowest-risk policy flagged default.
pub fn first_default(sorted: &[Policy]) -> Option<&Policy> {
    sorted.iter().find(|p| p.is_default)
}

/// Rung directly above `name`. `None` at the ceiling or if `name` is absent.
pub fn next_after<'a>(sorted: &'a [Policy], name: &str) -> Option<&'a Policy> {
    position(sorted, name).and_then(|i| sorted.get(i + 1))
}

/// Rung directly below `name`. `None` at the floor or if `name` is absent.
pub fn previous_before<'a>(sorted: &'a [Policy], name: &str) -> Option<&'a Policy> {
    position(sorted, name)
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| sorted.get(i))
}

/// The single ladder move that takes a workload to a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LadderStep {
    /// Re-apply the current policy.
    Hold,
    Next,
    Previous,
    Safest,
    Default,
}

impl fmt::Display for LadderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LadderStep::Hold => "hold",
            LadderStep::Next => "next",
            LadderStep::Previous => "previous",
            LadderStep::Safest => "safest",
            LadderStep::Default => "default",
        };
        f.write_str(s)
    }
}

/// Classify `from -> to` as one ladder step, or `None` if it skips rungs.
///
/// With no current policy only the floor or the default are reachable.
pub fn classify_step(sorted: &[Policy], from: Option<&str>, to: &str) -> Option<LadderStep> {
    if let Some(from) = from {
        if from == to {
            return Some(LadderStep::Hold);
        }
        if next_after(sorted, from).is_some_and(|p| p.name == to) {
            return Some(LadderStep::Next);
        }
        if previous_before(sorted, from).is_some_and(|p| p.name == to) {
            return Some(LadderStep::Previous);
        }
    }
    if safest(sorted).is_some_and(|p| p.name == to) {
        return Some(LadderStep::Safest);
    }
    if first_default(sorted).is_some_and(|p| p.name == to) {
        return Some(LadderStep::Default);
    }
    None
}
