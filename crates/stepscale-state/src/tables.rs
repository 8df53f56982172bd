//! redb table definitions for the stepscale registry.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Policies keyed by `{name}`.
pub const POLICIES: TableDefinition<&str, &[u8]> = TableDefinition::new("policies");

/// Policy recommendations keyed by `{namespace}/{workload}`.
pub const RECOMMENDATIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("recommendations");

/// Autoscaler resources keyed by `{kind}:{namespace}/{workload}`.
pub const AUTOSCALERS: TableDefinition<&str, &[u8]> = TableDefinition::new("autoscalers");

/// Shape shared by every table: string key, JSON value.
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;
