//! Coordinator error types.

use thiserror::Error;
use tiergate_id::Tier;

/// Errors surfaced by the coordinator.
///
/// Only lifecycle errors reach `Schedule*` callers; queue errors are
/// logged where they occur.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// `start` was called while the coordinator was already running.
    #[error("coordinator already started")]
    AlreadyStarted,

    /// The tier's work queue is full; the enqueue attempt was dropped.
    #[error("{tier} queue saturated (capacity {capacity})")]
    QueueSaturated { tier: Tier, capacity: usize },

    /// The tier's work queue has no consumer left. Happens when a retry
    /// timer fires after its coordinator has been dropped.
    #[error("{tier} queue closed")]
    QueueClosed { tier: Tier },
}
