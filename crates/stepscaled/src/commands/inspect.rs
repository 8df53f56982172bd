//! Read-only views over the state store.

use stepscale_policy::PolicyLadder;
use stepscale_state::{OpContext, Policy, PolicyRecommendation, RecommendationRegistry};

use crate::config::StepscaleConfig;

pub fn ladder(config: &StepscaleConfig, format: &str) -> anyhow::Result<()> {
    let state = crate::open_store(config)?;
    let policies = PolicyLadder::new(state).sorted_policies(&OpContext::background())?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&policies)?),
        _ => print!("{}", format_ladder(&policies)),
    }
    Ok(())
}

pub fn recommendations(config: &StepscaleConfig, format: &str) -> anyhow::Result<()> {
    let state = crate::open_store(config)?;
    let mut recs = state.list_recommendations()?;
    recs.sort_by(|a, b| a.table_key().cmp(&b.table_key()));

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&recs)?),
        _ => print!("{}", format_recommendations(&recs)),
    }
    Ok(())
}

fn format_ladder(policies: &[Policy]) -> String {
    if policies.is_empty() {
        return "no policies\n".to_string();
    }
    let mut out = format!("{:<6} {:<24} {:>10}  {}\n", "RUNG", "POLICY", "RISK", "DEFAULT");
    for (rung, policy) in policies.iter().enumerate() {
        let default = if policy.is_default { "*" } else { "" };
        out.push_str(&format!(
            "{:<6} {:<24} {:>10}  {}\n",
            rung, policy.name, policy.risk_index, default
        ));
    }
    out
}

fn format_recommendations(recs: &[PolicyRecommendation]) -> String {
    if recs.is_empty() {
        return "no recommendations\n".to_string();
    }
    let mut out = format!(
        "{:<40} {:<16} {:<16} {:<11} {}\n",
        "WORKLOAD", "CURRENT", "POLICY", "PHASE", "LAST CONDITION"
    );
    for rec in recs {
        let last = rec
            .status
            .conditions
            .last()
            .map(|c| format!("{}: {}", c.reason, c.message))
            .unwrap_or_default();
        out.push_str(&format!(
            "{:<40} {:<16} {:<16} {:<11} {}\n",
            rec.workload.to_string(),
            rec.current_policy.as_deref().unwrap_or("-"),
            rec.policy,
            rec.phase().to_string(),
            last
        ));
    }
    out
}
