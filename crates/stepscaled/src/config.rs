//! stepscale.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stepscale_state::{AutoscalerKind, Labels};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepscaleConfig {
    pub store: StoreConfig,
    pub controller: ControllerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/stepscale/stepscale.redb"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Seconds between controller passes.
    pub interval_secs: u64,
    /// Upper bound on one recommendation execution. 0 disables it.
    pub op_timeout_secs: u64,
    pub autoscaler: AutoscalerKind,
    /// Stamped on every autoscaler the controller writes.
    pub labels: Labels,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            op_timeout_secs: 10,
            autoscaler: AutoscalerKind::Hpa,
            labels: Labels::from([(
                "app.kubernetes.io/managed-by".to_string(),
                "stepscale".to_string(),
            )]),
        }
    }
}

impl ControllerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn op_timeout(&self) -> Option<Duration> {
        (self.op_timeout_secs > 0).then(|| Duration::from_secs(self.op_timeout_secs))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl StepscaleConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StepscaleConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Read `path` if given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
