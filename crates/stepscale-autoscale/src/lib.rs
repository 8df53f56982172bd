//! stepscale-autoscale: autoscaler reconciliation.
//!
//! Converges exactly one autoscaler resource per workload to the bounds
//! a recommendation asks for, independent of how those bounds were
//! chosen.
//!
//! # Contract
//!
//! ```text
//! create_or_update(workload, labels, max, min, target)
//!     absent  -> create { scaleTargetRef = workload, bounds, labels }  => Created
//!     present -> update bounds + labels in place (version-checked)     => Updated
//!
//! delete(resource)
//!     present -> remove
//!     absent  -> Ok (nothing to do)
//! ```
//!
//! Repeating a call with the same arguments leaves the resource in the
//! same state. Multiple backend kinds sit behind the one
//! [`AutoscalerClient`] trait; [`client_for`] picks the variant.

pub mod client;
pub mod error;
pub mod reconciler;

pub use client::{AutoscalerClient, Operation, client_for};
pub use error::{ReconcileError, ReconcileResult};
pub use reconciler::AutoscalerReconciler;
