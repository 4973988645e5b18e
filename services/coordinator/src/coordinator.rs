//! Coordinator façade.
//!
//! Owns the per-tier pending trackers and work queues, computes per-domain
//! readiness, releases blocked work when a prerequisite tier drains, and
//! starts and stops the background workers.
//!
//! Readiness of tier T for domain D means no tier-T reference is pending
//! for D. It is a snapshot taken under that tier's lock only; no code path
//! holds two tier locks at once.
//!
//! Workers only ever see the scheduling state, never the lifecycle. Dropping
//! the last `Coordinator` handle drops the shutdown sender, which stops
//! every background task even if `stop` was never called.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tiergate_id::{Domain, ObjectRef, Tier};
use tiergate_reconcile::Reconciler;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::ledger::{CompletionLedger, LedgerSweepConfig, LedgerSweeper};
use crate::pending::PendingTracker;
use crate::queue::WorkQueue;
use crate::worker::{CompletionHandler, StageWorker, StageWorkerConfig};

/// One reconciler per tier.
#[derive(Clone)]
pub struct Reconcilers {
    pub tier1: Arc<dyn Reconciler>,
    pub tier2: Arc<dyn Reconciler>,
    pub tier3: Arc<dyn Reconciler>,
}

impl Reconcilers {
    pub fn new(
        tier1: Arc<dyn Reconciler>,
        tier2: Arc<dyn Reconciler>,
        tier3: Arc<dyn Reconciler>,
    ) -> Self {
        Self {
            tier1,
            tier2,
            tier3,
        }
    }

    /// Reconciler responsible for a tier.
    pub fn for_tier(&self, tier: Tier) -> Arc<dyn Reconciler> {
        match tier {
            Tier::One => Arc::clone(&self.tier1),
            Tier::Two => Arc::clone(&self.tier2),
            Tier::Three => Arc::clone(&self.tier3),
        }
    }
}

/// Tier-ordered scheduler.
///
/// Cheap to clone; clones share state. `schedule_*` and `on_*_complete` are
/// synchronous and never block, so they may be called from any task or
/// thread. `start` must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    reconcilers: Reconcilers,
    state: Arc<SchedulerState>,
    lifecycle: Mutex<Option<Running>>,
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

/// Pending sets, queues, and ledger. Shared with the stage workers.
struct SchedulerState {
    pending: [PendingTracker; 3],
    queues: [WorkQueue; 3],
    ledger: Arc<CompletionLedger>,
}

impl Coordinator {
    /// Create a stopped coordinator.
    pub fn new(config: CoordinatorConfig, reconcilers: Reconcilers) -> Self {
        let capacity = config.queue_capacity;
        Self {
            inner: Arc::new(CoordinatorInner {
                state: Arc::new(SchedulerState {
                    pending: Tier::ALL.map(PendingTracker::new),
                    queues: Tier::ALL.map(|tier| WorkQueue::new(tier, capacity)),
                    ledger: Arc::new(CompletionLedger::new()),
                }),
                lifecycle: Mutex::new(None),
                config,
                reconcilers,
            }),
        }
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Schedule a tier-1 reference. Tier 1 has no prerequisite, so it is
    /// always offered to the queue.
    pub fn schedule_tier1(&self, object: ObjectRef) {
        self.inner.state.schedule_at(Tier::One, object);
    }

    /// Schedule a tier-2 reference; enqueued now only if tier 1 is ready
    /// for its domain.
    pub fn schedule_tier2(&self, object: ObjectRef) {
        self.inner.state.schedule_at(Tier::Two, object);
    }

    /// Schedule a tier-3 reference; enqueued now only if tiers 1 and 2 are
    /// ready for its domain.
    pub fn schedule_tier3(&self, object: ObjectRef) {
        self.inner.state.schedule_at(Tier::Three, object);
    }

    /// Schedule a reference through the entry point of its own tier.
    pub fn schedule(&self, object: ObjectRef) {
        self.inner.state.schedule_at(object.tier(), object);
    }

    // =========================================================================
    // Completion
    // =========================================================================

    pub fn on_tier1_complete(&self, object: &ObjectRef, success: bool) {
        self.inner.state.complete_at(Tier::One, object, success);
    }

    pub fn on_tier2_complete(&self, object: &ObjectRef, success: bool) {
        self.inner.state.complete_at(Tier::Two, object, success);
    }

    pub fn on_tier3_complete(&self, object: &ObjectRef, success: bool) {
        self.inner.state.complete_at(Tier::Three, object, success);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Spawn the three stage workers and the ledger sweeper.
    pub fn start(&self) -> Result<(), CoordinatorError> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.is_some() {
            warn!("Coordinator start requested while already running");
            return Err(CoordinatorError::AlreadyStarted);
        }

        let config = &self.inner.config;
        let state = &self.inner.state;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::with_capacity(Tier::ALL.len() + 1);

        for tier in Tier::ALL {
            let queue = state.queue(tier);
            let worker = StageWorker::new(
                self.inner.reconcilers.for_tier(tier),
                queue.sender().clone(),
                queue.receiver(),
                Arc::clone(state) as Arc<dyn CompletionHandler>,
                StageWorkerConfig {
                    reconcile_timeout: config.reconcile_timeout,
                    retry: config.retry,
                },
            );
            let shutdown_rx = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                worker.run(shutdown_rx).await;
            }));
        }

        let sweeper = LedgerSweeper::new(
            Arc::clone(&state.ledger),
            LedgerSweepConfig {
                interval: config.ledger_sweep_interval.max(Duration::from_millis(1)),
                retention: config.ledger_retention,
            },
        );
        tasks.push(tokio::spawn(async move {
            sweeper.run(shutdown_rx).await;
        }));

        *lifecycle = Some(Running { shutdown_tx, tasks });
        info!(
            queue_capacity = config.queue_capacity,
            retry_backoff_ms = config.retry.backoff.as_millis() as u64,
            "Coordinator started"
        );
        Ok(())
    }

    /// Signal every background task to exit. No-op when not running.
    ///
    /// Does not wait; an in-flight reconcile call is allowed to finish.
    pub fn stop(&self) {
        drop(self.signal_stop());
    }

    /// Stop and wait up to `grace` for background tasks to exit.
    pub async fn stop_and_wait(&self, grace: Duration) {
        let Some(tasks) = self.signal_stop() else {
            return;
        };

        let deadline = tokio::time::Instant::now() + grace;
        for task in tasks {
            match tokio::time::timeout_at(deadline, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Coordinator task panicked"),
                Err(_) => warn!("Coordinator task did not shut down in time"),
            }
        }

        info!("Coordinator shutdown complete");
    }

    fn signal_stop(&self) -> Option<Vec<JoinHandle<()>>> {
        let running = self.lifecycle().take()?;
        let _ = running.shutdown_tx.send(true);
        info!("Coordinator stopping");
        Some(running.tasks)
    }

    pub fn is_started(&self) -> bool {
        self.lifecycle().is_some()
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// References pending at `tier` for `domain`, in scheduling order.
    pub fn pending(&self, tier: Tier, domain: &Domain) -> Vec<ObjectRef> {
        self.inner.state.tracker(tier).snapshot(domain)
    }

    /// Total references pending at `tier` across all domains.
    pub fn pending_total(&self, tier: Tier) -> usize {
        self.inner.state.tracker(tier).len()
    }

    /// Whether nothing is pending at `tier` for `domain`.
    pub fn is_ready(&self, tier: Tier, domain: &Domain) -> bool {
        self.inner.state.tracker(tier).is_ready(domain)
    }

    /// Number of references waiting in a tier's queue.
    pub fn queued(&self, tier: Tier) -> usize {
        self.inner.state.queue(tier).sender().len()
    }

    pub fn ledger(&self) -> &CompletionLedger {
        &self.inner.state.ledger
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    fn lifecycle(&self) -> MutexGuard<'_, Option<Running>> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SchedulerState {
    fn schedule_at(&self, tier: Tier, object: ObjectRef) {
        if !tier_matches(tier, &object) {
            return;
        }

        // Record before checking readiness: a cascade racing with this call
        // then either sees the reference or has already made the tier ready.
        let newly_pending = self.tracker(tier).record(&object);

        match self.blocking_tier(tier, object.domain()) {
            Some(blocked_on) => {
                debug!(
                    object = %object,
                    blocked_on = %blocked_on,
                    newly_pending,
                    "Scheduled, waiting on prerequisite tier"
                );
            }
            None => {
                self.queue(tier).sender().offer(&object);
            }
        }
    }

    fn complete_at(&self, tier: Tier, object: &ObjectRef, success: bool) {
        if !tier_matches(tier, object) {
            return;
        }

        if !success {
            debug!(object = %object, "Reconcile unsuccessful, object stays pending");
            return;
        }

        let removal = self.tracker(tier).remove(object);
        if !removal.removed {
            debug!(object = %object, "Completion for object that was not pending");
        }
        self.ledger.record(object);

        if removal.is_drained() {
            if let Some(next) = tier.next() {
                self.cascade(next, object.domain());
            }
        }
    }

    /// Offer every pending `tier` reference of `domain` to its queue, provided
    /// all prerequisite tiers are ready. Continues into the following tier
    /// when nothing is pending at this one.
    fn cascade(&self, tier: Tier, domain: &Domain) {
        if let Some(blocked_on) = self.blocking_tier(tier, domain) {
            debug!(
                domain = %domain,
                tier = %tier,
                blocked_on = %blocked_on,
                "Cascade held back by prerequisite tier"
            );
            return;
        }

        let released = self.tracker(tier).snapshot(domain);
        if released.is_empty() {
            if let Some(next) = tier.next() {
                self.cascade(next, domain);
            }
            return;
        }

        let sender = self.queue(tier).sender();
        let enqueued = released.iter().filter(|object| sender.offer(object)).count();

        info!(
            domain = %domain,
            tier = %tier,
            pending = released.len(),
            enqueued,
            "Cascade released pending objects"
        );
    }

    fn tracker(&self, tier: Tier) -> &PendingTracker {
        &self.pending[tier.index()]
    }

    fn queue(&self, tier: Tier) -> &WorkQueue {
        &self.queues[tier.index()]
    }

    /// First prerequisite tier that still has pending work for the domain.
    fn blocking_tier(&self, tier: Tier, domain: &Domain) -> Option<Tier> {
        tier.prerequisites()
            .iter()
            .copied()
            .find(|prerequisite| !self.tracker(*prerequisite).is_ready(domain))
    }
}

impl CompletionHandler for SchedulerState {
    fn on_complete(&self, object: &ObjectRef, success: bool) {
        self.complete_at(object.tier(), object, success);
    }
}

fn tier_matches(tier: Tier, object: &ObjectRef) -> bool {
    if object.tier() == tier {
        return true;
    }
    error!(
        object = %object,
        entry_point = %tier,
        "Object tier does not match entry point, ignoring"
    );
    false
}
