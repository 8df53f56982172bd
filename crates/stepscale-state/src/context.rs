//! Per-operation cancellation and deadline signal.
//!
//! Every registry-facing operation takes an [`OpContext`] and checks it
//! before issuing a call, so an interrupted operation never starts a new
//! mutation. Work already handed to the registry finishes atomically.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::watch;

/// Why an operation stopped before reaching the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation/deadline carrier passed to every operation.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl OpContext {
    /// A context that never expires.
    pub fn background() -> Self {
        Self::default()
    }

    /// Tighten the deadline. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancel when the watched value becomes `true` (the shutdown channel).
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail if the operation was cancelled or ran past its deadline.
    pub fn check(&self) -> Result<(), Interrupted> {
        if let Some(rx) = &self.cancel
            && *rx.borrow()
        {
            return Err(Interrupted::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }
}
