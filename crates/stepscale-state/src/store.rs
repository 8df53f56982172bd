//! StateStore: redb-backed resource registry for stepscale.
//!
//! Provides typed CRUD operations over policies, recommendations, and
//! autoscaler resources. All values are JSON-serialized into redb's
//! `&[u8]` value columns. The store supports both on-disk and in-memory
//! backends (the latter for testing).
//!
//! Autoscaler writes are compare-and-swap on `resource_version` inside a
//! single write transaction, so a racing writer observes `Conflict` and
//! never a torn `(min, max, target)` triple.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::registry::*;
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe registry backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(POLICIES).map_err(map_err!(Table))?;
        txn.open_table(RECOMMENDATIONS).map_err(map_err!(Table))?;
        txn.open_table(AUTOSCALERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get_value<T: DeserializeOwned>(
        &self,
        def: JsonTable,
        key: &str,
    ) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value = serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn list_values<T: DeserializeOwned>(
        &self,
        def: JsonTable,
    ) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            results.push(serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?);
        }
        Ok(results)
    }

    fn delete_key(&self, def: JsonTable, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(def).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    // ── Policies ───────────────────────────────────────────────────

    /// Insert or update a policy.
    ///
    /// Rejects a policy whose risk index is already held by another policy,
    /// so the ladder order never depends on listing order.
    pub fn put_policy(&self, policy: &Policy) -> StateResult<()> {
        let value = serde_json::to_vec(policy).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(POLICIES).map_err(map_err!(Table))?;
            let mut existing: Vec<Policy> = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (_, v) = entry.map_err(map_err!(Read))?;
                existing.push(serde_json::from_slice(v.value()).map_err(map_err!(Deserialize))?);
            }
            if let Some(holder) = risk_index_holder(&existing, policy) {
                return Err(StateError::DuplicateRiskIndex {
                    name: policy.name.clone(),
                    risk_index: policy.risk_index,
                    existing: holder.name.clone(),
                });
            }
            table
                .insert(policy.table_key(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(policy = %policy.name, risk_index = policy.risk_index, "policy stored");
        Ok(())
    }

    // ── Autoscalers ────────────────────────────────────────────────

    /// List all autoscaler resources.
    pub fn list_autoscalers(&self) -> StateResult<Vec<AutoscalerResource>> {
        self.list_values(AUTOSCALERS)
    }

    /// Compare-and-swap write of an autoscaler resource.
    ///
    /// `expected` is `None` for a create (the key must be absent) or the
    /// version the caller read for an update.
    fn swap_autoscaler(
        &self,
        resource: &AutoscalerResource,
        expected: Option<u64>,
    ) -> StateResult<AutoscalerResource> {
        let key = resource.table_key();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let stored;
        {
            let mut table = txn.open_table(AUTOSCALERS).map_err(map_err!(Table))?;
            let current: Option<AutoscalerResource> =
                match table.get(key.as_str()).map_err(map_err!(Read))? {
                    Some(guard) => Some(
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?,
                    ),
                    None => None,
                };
            match (expected, &current) {
                (None, Some(_)) => return Err(StateError::AlreadyExists(key)),
                (Some(_), None) => return Err(StateError::NotFound(key)),
                (Some(want), Some(have)) if want != have.resource_version => {
                    return Err(StateError::Conflict {
                        key,
                        expected: want,
                        actual: have.resource_version,
                    });
                }
                _ => {}
            }
            let mut next = resource.clone();
            next.resource_version = next_version(current.as_ref());
            let value = serde_json::to_vec(&next).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            stored = next;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, version = stored.resource_version, "autoscaler stored");
        Ok(stored)
    }
}

impl PolicySource for StateStore {
    fn list_policies(&self) -> StateResult<Vec<Policy>> {
        self.list_values(POLICIES)
    }

    fn get_policy(&self, name: &str) -> StateResult<Option<Policy>> {
        self.get_value(POLICIES, name)
    }
}

impl RecommendationRegistry for StateStore {
    fn get_recommendation(&self, key: &str) -> StateResult<Option<PolicyRecommendation>> {
        self.get_value(RECOMMENDATIONS, key)
    }

    fn list_recommendations(&self) -> StateResult<Vec<PolicyRecommendation>> {
        self.list_values(RECOMMENDATIONS)
    }

    fn put_recommendation(&self, rec: &PolicyRecommendation) -> StateResult<()> {
        let key = rec.table_key();
        let value = serde_json::to_vec(rec).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(RECOMMENDATIONS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, phase = %rec.phase(), "recommendation stored");
        Ok(())
    }
}

impl AutoscalerRegistry for StateStore {
    fn get_autoscaler(&self, key: &str) -> StateResult<Option<AutoscalerResource>> {
        self.get_value(AUTOSCALERS, key)
    }

    fn create_autoscaler(
        &self,
        resource: &AutoscalerResource,
    ) -> StateResult<AutoscalerResource> {
        self.swap_autoscaler(resource, None)
    }

    fn update_autoscaler(
        &self,
        resource: &AutoscalerResource,
    ) -> StateResult<AutoscalerResource> {
        self.swap_autoscaler(resource, Some(resource.resource_version))
    }

    fn delete_autoscaler(&self, key: &str) -> StateResult<bool> {
        let existed = self.delete_key(AUTOSCALERS, key)?;
        debug!(%key, existed, "autoscaler deleted");
        Ok(existed)
    }
}
