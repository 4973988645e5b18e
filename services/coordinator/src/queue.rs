//! Bounded per-tier work queues.
//!
//! Enqueue never blocks: when a queue is full the attempt is dropped and
//! logged. The reference stays in its pending set, so a later cascade
//! (tiers 2 and 3) or its own retry path (tier 1) may offer it again.

use std::sync::Arc;

use tiergate_id::{ObjectRef, Tier};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::error::CoordinatorError;

/// Cloneable producer side of a tier's work queue.
#[derive(Debug, Clone)]
pub struct QueueSender {
    tier: Tier,
    capacity: usize,
    tx: mpsc::Sender<ObjectRef>,
}

impl QueueSender {
    /// Try to enqueue without blocking.
    pub fn try_enqueue(&self, object: ObjectRef) -> Result<(), CoordinatorError> {
        self.tx.try_send(object).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CoordinatorError::QueueSaturated {
                tier: self.tier,
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => CoordinatorError::QueueClosed { tier: self.tier },
        })
    }

    /// Enqueue, logging instead of failing when the attempt is dropped.
    ///
    /// Returns true if the reference was enqueued.
    pub fn offer(&self, object: &ObjectRef) -> bool {
        match self.try_enqueue(object.clone()) {
            Ok(()) => {
                debug!(tier = %self.tier, object = %object, "Enqueued");
                true
            }
            Err(e) => {
                warn!(
                    tier = %self.tier,
                    object = %object,
                    error = %e,
                    "Dropping enqueue attempt"
                );
                false
            }
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Number of references currently waiting in the queue.
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Bounded FIFO of references awaiting reconciliation for one tier.
///
/// The receiver is shared behind an async mutex so that a restarted worker
/// can take over the same queue once the previous one has exited.
#[derive(Debug)]
pub struct WorkQueue {
    sender: QueueSender,
    rx: Arc<Mutex<mpsc::Receiver<ObjectRef>>>,
}

impl WorkQueue {
    /// Create a queue with a fixed capacity.
    ///
    /// A zero capacity is raised to one.
    pub fn new(tier: Tier, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            sender: QueueSender { tier, capacity, tx },
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn sender(&self) -> &QueueSender {
        &self.sender
    }

    /// Shared consumer side, locked by the tier's worker while it runs.
    pub fn receiver(&self) -> Arc<Mutex<mpsc::Receiver<ObjectRef>>> {
        Arc::clone(&self.rx)
    }
}
