//! stepscaled: the stepscale daemon.
//!
//! Executes queued policy recommendations against workload autoscalers,
//! one ladder rung at a time, and offers a few inspection commands over
//! the same state store.
//!
//! # Usage
//!
//! ```text
//! stepscaled run --config /etc/stepscale/stepscale.toml
//! stepscaled import-policies policies.json --config stepscale.toml
//! stepscaled ladder --config stepscale.toml
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::StepscaleConfig;

#[derive(Parser)]
#[command(
    name = "stepscaled",
    about = "stepscale daemon: risk-ordered autoscaling policy rollout",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to stepscale.toml. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the recommendation controller until interrupted.
    Run,
    /// Print the policy ladder, safest first.
    Ladder {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Load policies from a JSON array file into the store.
    ImportPolicies {
        /// JSON file holding an array of policies.
        file: PathBuf,
    },
    /// List stored recommendations and their phases.
    Recommendations {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new("info,stepscale=debug,stepscaled=debug")?,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = StepscaleConfig::load(cli.config.as_deref())?;
    init_tracing(config.logging.json)?;

    match cli.command {
        Command::Run => commands::run::run(&config).await,
        Command::Ladder { format } => commands::inspect::ladder(&config, &format),
        Command::ImportPolicies { file } => commands::policies::import(&config, &file),
        Command::Recommendations { format } => {
            commands::inspect::recommendations(&config, &format)
        }
    }
}

/// Open the configured store, creating its directory if needed.
fn open_store(config: &StepscaleConfig) -> anyhow::Result<stepscale_state::StateStore> {
    let path: &Path = &config.store.path;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let store = stepscale_state::StateStore::open(path)?;
    tracing::debug!(path = ?path, "state store opened");
    Ok(store)
}
