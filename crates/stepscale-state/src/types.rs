//! Domain types for the stepscale registry.
//!
//! These types represent the persisted state of policies, policy
//! recommendations, and the autoscaler resources they converge. All types
//! are serializable to/from JSON (camelCase, matching the orchestrator's
//! resource field names) for storage in redb tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique name of a policy on the ladder.
pub type PolicyName = String;

/// Label set attached to autoscaler resources.
pub type Labels = BTreeMap<String, String>;

// ── Policy ────────────────────────────────────────────────────────

/// A risk-ranked scaling policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub name: PolicyName,
    /// Ordering key of the ladder. Lower is safer.
    pub risk_index: i64,
    #[serde(default)]
    pub is_default: bool,
    /// Scaling-rule parameters (e.g. `minReplicaPercentageCut`,
    /// `targetUtilization`). Not interpreted by the ladder.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl Policy {
    pub fn new(name: &str, risk_index: i64) -> Self {
        Self {
            name: name.to_string(),
            risk_index,
            is_default: false,
            parameters: BTreeMap::new(),
        }
    }

    /// Flag this policy as a default.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Build the key for the policies table.
    pub fn table_key(&self) -> &str {
        &self.name
    }
}

// ── Workload ──────────────────────────────────────────────────────

/// Reference to the deployable unit an autoscaler targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WorkloadRef {
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

impl WorkloadRef {
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    /// Shorthand for a `Deployment` workload.
    pub fn deployment(namespace: &str, name: &str) -> Self {
        Self::new("Deployment", namespace, name)
    }

    /// Build the composite `{namespace}/{name}` key.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

// ── HPA configuration ─────────────────────────────────────────────

/// Scaling bounds for a workload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HpaConfiguration {
    pub min: u32,
    pub max: u32,
    pub target_metric_value: u32,
}

impl HpaConfiguration {
    pub fn new(min: u32, max: u32, target_metric_value: u32) -> Self {
        Self {
            min,
            max,
            target_metric_value,
        }
    }

    /// `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

// ── Recommendation ────────────────────────────────────────────────

/// Lifecycle phase of a policy recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecommendationPhase {
    #[default]
    Generated,
    Queued,
    Executed,
    Superseded,
}

impl RecommendationPhase {
    /// Executed and Superseded recommendations never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RecommendationPhase::Executed | RecommendationPhase::Superseded
        )
    }
}

impl fmt::Display for RecommendationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecommendationPhase::Generated => "Generated",
            RecommendationPhase::Queued => "Queued",
            RecommendationPhase::Executed => "Executed",
            RecommendationPhase::Superseded => "Superseded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A status condition in the orchestrator's `{type,status,reason,message}` shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    /// Unix timestamp (seconds).
    pub last_transition_time: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationStatus {
    #[serde(default)]
    pub phase: RecommendationPhase,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A proposed policy/bounds change for one workload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecommendation {
    pub workload: WorkloadRef,
    #[serde(rename = "targetHPAConfig")]
    pub target_hpa_config: HpaConfiguration,
    #[serde(rename = "currentHPAConfig", default)]
    pub current_hpa_config: HpaConfiguration,
    /// Policy the target bounds were derived from.
    pub policy: PolicyName,
    /// Policy whose bounds are currently applied, if any.
    #[serde(default)]
    pub current_policy: Option<PolicyName>,
    pub generated_at: u64,
    pub queued_for_execution: bool,
    #[serde(default)]
    pub queued_for_execution_at: Option<u64>,
    #[serde(default)]
    pub status: RecommendationStatus,
}

impl PolicyRecommendation {
    /// Build a freshly generated recommendation.
    pub fn generated(
        workload: WorkloadRef,
        policy: &str,
        target: HpaConfiguration,
        generated_at: u64,
    ) -> Self {
        Self {
            workload,
            target_hpa_config: target,
            current_hpa_config: HpaConfiguration::default(),
            policy: policy.to_string(),
            current_policy: None,
            generated_at,
            queued_for_execution: false,
            queued_for_execution_at: None,
            status: RecommendationStatus::default(),
        }
    }

    /// Record what is currently applied to the workload.
    pub fn with_current(mut self, policy: Option<&str>, config: HpaConfiguration) -> Self {
        self.current_policy = policy.map(str::to_string);
        self.current_hpa_config = config;
        self
    }

    pub fn phase(&self) -> RecommendationPhase {
        self.status.phase
    }

    /// Build the key for the recommendations table.
    pub fn table_key(&self) -> String {
        self.workload.table_key()
    }
}

// ── Autoscaler ────────────────────────────────────────────────────

/// Autoscaler backend variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoscalerKind {
    /// Native horizontal pod autoscaler.
    Hpa,
    /// Event-driven scaled object.
    ScaledObject,
}

impl AutoscalerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AutoscalerKind::Hpa => "hpa",
            AutoscalerKind::ScaledObject => "scaledobject",
        }
    }
}

impl fmt::Display for AutoscalerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoscalerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hpa" => Ok(AutoscalerKind::Hpa),
            "scaledobject" | "scaled_object" => Ok(AutoscalerKind::ScaledObject),
            other => Err(format!("unknown autoscaler kind: {other}")),
        }
    }
}

/// How `target_metric_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetType {
    /// Percentage of requested resources.
    Utilization,
    /// Absolute per-replica value.
    AverageValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScaleTargetRef {
    pub name: String,
    pub kind: String,
}

/// An orchestrator-owned autoscaling resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalerResource {
    pub kind: AutoscalerKind,
    pub namespace: String,
    pub name: String,
    pub scale_target_ref: ScaleTargetRef,
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub target_metric_value: u32,
    pub target_type: TargetType,
    #[serde(default)]
    pub labels: Labels,
    /// Bumped on every write. Updates must carry the version they read.
    #[serde(default)]
    pub resource_version: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl AutoscalerResource {
    /// Build the key for the autoscalers table.
    pub fn table_key(&self) -> String {
        autoscaler_key(self.kind, &self.namespace, &self.name)
    }

    /// The `(min, max, target)` triple.
    pub fn bounds(&self) -> HpaConfiguration {
        HpaConfiguration::new(self.min_replicas, self.max_replicas, self.target_metric_value)
    }
}

/// Key of the autoscaler of `kind` bound to a workload.
pub fn autoscaler_key(kind: AutoscalerKind, namespace: &str, name: &str) -> String {
    format!("{kind}:{namespace}/{name}")
}

/// Current unix time in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
