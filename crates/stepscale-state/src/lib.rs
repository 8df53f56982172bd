//! stepscale-state: resource registry for stepscale.
//!
//! Holds the persisted records the policy ladder, autoscaler reconciler
//! and recommendation controller operate on: policies, policy
//! recommendations, and autoscaler resources.
//!
//! # Architecture
//!
//! Components never talk to a concrete store. They depend on the
//! capability traits in [`registry`] (`PolicySource`,
//! `AutoscalerRegistry`, `RecommendationRegistry`), implemented by:
//!
//! - [`StateStore`]: redb, on-disk or in-memory. `Clone` + `Send` +
//!   `Sync` (backed by `Arc<Database>`).
//! - [`MemoryRegistry`]: an in-process fake with failure injection.
//!
//! Autoscaler writes are optimistic: each carries the `resource_version`
//! it read and fails with [`StateError::Conflict`] if another writer got
//! there first.

pub mod context;
pub mod error;
pub mod memory;
pub mod registry;
pub mod store;
pub mod tables;
pub mod types;

pub use context::{Interrupted, OpContext};
pub use error::{StateError, StateResult};
pub use memory::MemoryRegistry;
pub use registry::{AutoscalerRegistry, PolicySource, RecommendationRegistry};
pub use store::StateStore;
pub use types::*;
