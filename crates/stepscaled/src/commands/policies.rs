use std::path::Path;

use stepscale_state::Policy;
use tracing::info;

use crate::config::StepscaleConfig;

/// Parse a JSON array of policies.
pub fn parse_policies(content: &str) -> anyhow::Result<Vec<Policy>> {
    Ok(serde_json::from_str(content)?)
}

pub fn import(config: &StepscaleConfig, file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)?;
    let policies = parse_policies(&content)?;
    let state = crate::open_store(config)?;

    for policy in &policies {
        state.put_policy(policy)?;
        info!(policy = %policy.name, risk_index = policy.risk_index, "policy imported");
    }
    println!("✓ Imported {} policies from {}", policies.len(), file.display());
    Ok(())
}
