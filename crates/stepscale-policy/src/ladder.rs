//! PolicyLadder: ordered view over the policy registry.
//!
//! Every query re-lists and re-sorts the full policy set. There is no
//! cached index: an admin editing a policy is visible on the very next
//! call. Stepping past either end of the ladder is always an error; the
//! ladder never clamps to the nearest valid rung.

use stepscale_state::{OpContext, Policy, PolicySource};
use tracing::debug;

use crate::error::{LadderError, LadderResult};
use crate::ordering::{self, LadderStep};

/// Risk-ordered policy traversal over a [`PolicySource`].
#[derive(Clone)]
pub struct PolicyLadder<S> {
    source: S,
}

impl<S: PolicySource> PolicyLadder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    fn list(&self, ctx: &OpContext, op: &'static str) -> LadderResult<Vec<Policy>> {
        ctx.check()?;
        let policies = self
            .source
            .list_policies()
            .map_err(|source| LadderError::StoreUnavailable { op, source })?;
        Ok(ordering::sort_policies(policies))
    }

    /// Sorted ladder that must contain `name`.
    fn list_containing(
        &self,
        ctx: &OpContext,
        op: &'static str,
        name: &str,
    ) -> LadderResult<Vec<Policy>> {
        let sorted = self.list(ctx, op)?;
        if ordering::position(&sorted, name).is_none() {
            return Err(LadderError::NotFound(name.to_string()));
        }
        Ok(sorted)
    }

    /// All policies, safest first.
    pub fn sorted_policies(&self, ctx: &OpContext) -> LadderResult<Vec<Policy>> {
        self.list(ctx, "sorted_policies")
    }

    /// The floor of the ladder.
    pub fn safest_policy(&self, ctx: &OpContext) -> LadderResult<Policy> {
        let sorted = self.list(ctx, "safest_policy")?;
        let policy = ordering::safest(&sorted)
            .cloned()
            .ok_or(LadderError::EmptyPolicySet)?;
        debug!(policy = %policy.name, risk_index = policy.risk_index, "safest policy");
        Ok(policy)
    }

    /// The lowest-risk policy flagged as default.
    pub fn default_policy(&self, ctx: &OpContext) -> LadderResult<Policy> {
        let sorted = self.list(ctx, "default_policy")?;
        let policy = ordering::first_default(&sorted)
            .cloned()
            .ok_or_else(|| LadderError::NotFound("default policy".to_string()))?;
        debug!(policy = %policy.name, "default policy");
        Ok(policy)
    }

    /// Exact lookup by name.
    pub fn policy_by_name(&self, ctx: &OpContext, name: &str) -> LadderResult<Policy> {
        ctx.check()?;
        self.source
            .get_policy(name)
            .map_err(|source| LadderError::StoreUnavailable {
                op: "policy_by_name",
                source,
            })?
            .ok_or_else(|| LadderError::NotFound(name.to_string()))
    }

    /// The rung directly above `current`.
    ///
    /// `current` is located by name on the fresh ladder; a policy that is
    /// no longer listed has no next rung.
    pub fn next_policy(&self, ctx: &OpContext, current: &Policy) -> LadderResult<Policy> {
        let sorted = self.list(ctx, "next_policy")?;
        ordering::next_after(&sorted, &current.name)
            .cloned()
            .ok_or_else(|| LadderError::NoNextPolicy(current.name.clone()))
    }

    /// The rung directly above the policy called `name`.
    pub fn next_policy_by_name(&self, ctx: &OpContext, name: &str) -> LadderResult<Policy> {
        debug!(policy = %name, "identifying next policy");
        let sorted = self.list_containing(ctx, "next_policy_by_name", name)?;
        ordering::next_after(&sorted, name)
            .cloned()
            .ok_or_else(|| LadderError::NoNextPolicy(name.to_string()))
    }

    /// The rung directly below the policy called `name`.
    pub fn previous_policy_by_name(&self, ctx: &OpContext, name: &str) -> LadderResult<Policy> {
        debug!(policy = %name, "identifying previous policy");
        let sorted = self.list_containing(ctx, "previous_policy_by_name", name)?;
        ordering::previous_before(&sorted, name)
            .cloned()
            .ok_or_else(|| LadderError::NoPreviousPolicy(name.to_string()))
    }

    /// Check that moving from `from` to `to` is exactly one ladder step.
    pub fn step_between(
        &self,
        ctx: &OpContext,
        from: Option<&str>,
        to: &str,
    ) -> LadderResult<LadderStep> {
        let sorted = self.list_containing(ctx, "step_between", to)?;
        let step = ordering::classify_step(&sorted, from, to).ok_or_else(|| {
            LadderError::MultiStep {
                from: from.map(str::to_string),
                to: to.to_string(),
            }
        })?;
        debug!(from = ?from, to = %to, %step, "ladder step validated");
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepscale_state::{MemoryRegistry, StateError, StateStore};
    use tokio::sync::watch;

    fn ctx() -> OpContext {
        OpContext::background()
    }

    /// A (risk 1, default), B (risk 5), C (risk 9).
    fn abc_registry() -> MemoryRegistry {
        let reg = MemoryRegistry::new();
        reg.put_policy(&Policy::new("C", 9)).unwrap();
        reg.put_policy(&Policy::new("A", 1).as_default()).unwrap();
        reg.put_policy(&Policy::new("B", 5)).unwrap();
        reg
    }

    #[test]
    fn abc_scenario() {
        let ladder = PolicyLadder::new(abc_registry());

        assert_eq!(ladder.default_policy(&ctx()).unwrap().name, "A");
        assert_eq!(ladder.next_policy_by_name(&ctx(), "A").unwrap().name, "B");
        assert!(matches!(
            ladder.next_policy_by_name(&ctx(), "C"),
            Err(LadderError::NoNextPolicy(ref n)) if n == "C"
        ));
        assert!(matches!(
            ladder.previous_policy_by_name(&ctx(), "A"),
            Err(LadderError::NoPreviousPolicy(ref n)) if n == "A"
        ));
    }

    #[test]
    fn sorted_policies_ascending() {
        let ladder = PolicyLadder::new(abc_registry());
        let names: Vec<_> = ladder
            .sorted_policies(&ctx())
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn previous_of_next_is_identity() {
        let ladder = PolicyLadder::new(abc_registry());
        for p in ladder.sorted_policies(&ctx()).unwrap() {
            if let Ok(next) = ladder.next_policy(&ctx(), &p) {
                let back = ladder.previous_policy_by_name(&ctx(), &next.name).unwrap();
                assert_eq!(back, p);
            }
        }
    }

    #[test]
    fn next_policy_at_ceiling_fails() {
        let ladder = PolicyLadder::new(abc_registry());
        let ceiling = Policy::new("C", 9);
        assert!(matches!(
            ladder.next_policy(&ctx(), &ceiling),
            Err(LadderError::NoNextPolicy(_))
        ));
    }

    #[test]
    fn next_policy_for_unlisted_policy_fails() {
        let ladder = PolicyLadder::new(abc_registry());
        let stray = Policy::new("Z", 3);
        assert!(matches!(
            ladder.next_policy(&ctx(), &stray),
            Err(LadderError::NoNextPolicy(_))
        ));
    }

    #[test]
    fn by_name_traversal_of_unknown_policy_is_not_found() {
        let ladder = PolicyLadder::new(abc_registry());
        assert!(matches!(
            ladder.next_policy_by_name(&ctx(), "nope"),
            Err(LadderError::NotFound(_))
        ));
        assert!(matches!(
            ladder.previous_policy_by_name(&ctx(), "nope"),
            Err(LadderError::NotFound(_))
        ));
        assert!(matches!(
            ladder.policy_by_name(&ctx(), "nope"),
            Err(LadderError::NotFound(_))
        ));
    }

    #[test]
    fn safest_policy_and_empty_set() {
        let ladder = PolicyLadder::new(abc_registry());
        assert_eq!(ladder.safest_policy(&ctx()).unwrap().name, "A");

        let empty = PolicyLadder::new(MemoryRegistry::new());
        assert!(matches!(
            empty.safest_policy(&ctx()),
            Err(LadderError::EmptyPolicySet)
        ));
        assert!(matches!(
            empty.default_policy(&ctx()),
            Err(LadderError::NotFound(_))
        ));
    }

    #[test]
    fn no_default_flagged() {
        let reg = MemoryRegistry::with_policies([Policy::new("x", 1), Policy::new("y", 2)]);
        let ladder = PolicyLadder::new(reg);
        assert!(matches!(
            ladder.default_policy(&ctx()),
            Err(LadderError::NotFound(_))
        ));
    }

    #[test]
    fn listing_failure_is_store_unavailable() {
        let reg = abc_registry();
        reg.fail_reads(true);
        let ladder = PolicyLadder::new(reg);

        let err = ladder.sorted_policies(&ctx()).unwrap_err();
        assert!(matches!(
            err,
            LadderError::StoreUnavailable {
                op: "sorted_policies",
                source: StateError::Unavailable(_)
            }
        ));
        assert!(matches!(
            ladder.policy_by_name(&ctx(), "A"),
            Err(LadderError::StoreUnavailable { .. })
        ));
    }

    #[test]
    fn sees_policy_edits_without_caching() {
        let reg = abc_registry();
        let ladder = PolicyLadder::new(reg.clone());
        assert!(ladder.next_policy_by_name(&ctx(), "C").is_err());

        reg.put_policy(&Policy::new("D", 12)).unwrap();
        assert_eq!(ladder.next_policy_by_name(&ctx(), "C").unwrap().name, "D");
    }

    #[test]
    fn step_between_validates_single_moves() {
        let ladder = PolicyLadder::new(abc_registry());
        assert_eq!(
            ladder.step_between(&ctx(), Some("A"), "B").unwrap(),
            LadderStep::Next
        );
        assert_eq!(
            ladder.step_between(&ctx(), Some("C"), "A").unwrap(),
            LadderStep::Safest
        );
        assert_eq!(
            ladder.step_between(&ctx(), None, "A").unwrap(),
            LadderStep::Safest
        );
        assert!(matches!(
            ladder.step_between(&ctx(), None, "C"),
            Err(LadderError::MultiStep { .. })
        ));
        assert!(matches!(
            ladder.step_between(&ctx(), Some("A"), "missing"),
            Err(LadderError::NotFound(_))
        ));
    }

    #[test]
    fn cancelled_context_skips_registry() {
        let reg = abc_registry();
        reg.fail_reads(true);
        let ladder = PolicyLadder::new(reg);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let ctx = OpContext::background().with_cancel(rx);

        assert!(matches!(
            ladder.sorted_policies(&ctx),
            Err(LadderError::Interrupted(_))
        ));
    }

    #[test]
    fn works_over_redb_store() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_policy(&Policy::new("steady", 10).as_default()).unwrap();
        store.put_policy(&Policy::new("aggressive", 50)).unwrap();
        store.put_policy(&Policy::new("safe", 0)).unwrap();

        let ladder = PolicyLadder::new(store);
        assert_eq!(ladder.safest_policy(&ctx()).unwrap().name, "safe");
        assert_eq!(ladder.default_policy(&ctx()).unwrap().name, "steady");
        assert_eq!(
            ladder.next_policy_by_name(&ctx(), "steady").unwrap().name,
            "aggressive"
        );
    }
}
