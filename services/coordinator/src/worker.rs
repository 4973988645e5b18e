//! Per-tier stage worker.
//!
//! Each tier has exactly one worker, so reconciliation within a tier is
//! strictly sequential. The worker suspends only on its queue or the
//! shutdown signal; a failed or requeued reference is handed to a
//! short-lived retry timer task instead of blocking the worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tiergate_id::{ObjectRef, Tier};
use tiergate_reconcile::{ReconcileError, ReconcileOutcome, Reconciler, RetryPolicy};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::queue::QueueSender;

/// Receives completion reports from stage workers.
pub trait CompletionHandler: Send + Sync + 'static {
    fn on_complete(&self, object: &ObjectRef, success: bool);
}

/// Stage worker configuration.
#[derive(Debug, Clone)]
pub struct StageWorkerConfig {
    /// Deadline for a single reconcile call.
    pub reconcile_timeout: Duration,

    /// Delay policy for failed and requeued references.
    pub retry: RetryPolicy,
}

/// What happened to a single dequeued reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Reconciled; completion reported.
    Succeeded,

    /// Reconcile failed or timed out; retry scheduled after the delay.
    Failed { retry_in: Duration },

    /// Reconciler asked to be called again; retry scheduled after the delay.
    Requeued { retry_in: Duration },
}

/// Drains one tier's queue and reconciles each reference.
pub struct StageWorker {
    tier: Tier,
    reconciler: Arc<dyn Reconciler>,
    queue: QueueSender,
    receiver: Arc<Mutex<mpsc::Receiver<ObjectRef>>>,
    completions: Arc<dyn CompletionHandler>,
    config: StageWorkerConfig,
}

impl StageWorker {
    /// Create a worker for the tier served by `queue`.
    pub fn new(
        reconciler: Arc<dyn Reconciler>,
        queue: QueueSender,
        receiver: Arc<Mutex<mpsc::Receiver<ObjectRef>>>,
        completions: Arc<dyn CompletionHandler>,
        config: StageWorkerConfig,
    ) -> Self {
        Self {
            tier: queue.tier(),
            reconciler,
            queue,
            receiver,
            completions,
            config,
        }
    }

    /// Run until shutdown is signaled.
    #[instrument(skip(self, shutdown), fields(tier = %self.tier))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            reconciler = self.reconciler.name(),
            timeout_secs = self.config.reconcile_timeout.as_secs(),
            "Starting stage worker"
        );

        // A previous worker may still be finishing an in-flight call.
        let mut rx = tokio::select! {
            biased;
            _ = shutdown_signaled(&mut shutdown) => {
                info!("Stage worker shutting down");
                return;
            }
            rx = self.receiver.lock() => rx,
        };

        let mut processed = 0u64;
        loop {
            let object = tokio::select! {
                biased;
                _ = shutdown_signaled(&mut shutdown) => break,
                msg = rx.recv() => match msg {
                    Some(object) => object,
                    None => {
                        debug!("Work queue closed");
                        break;
                    }
                },
            };

            if *shutdown.borrow() {
                break;
            }

            self.process(object, &shutdown).await;
            processed += 1;
        }

        info!(processed, "Stage worker shutting down");
    }

    /// Reconcile a single reference and act on the outcome.
    pub async fn process(&self, object: ObjectRef, shutdown: &watch::Receiver<bool>) -> Attempt {
        debug!(object = %object, "Reconciling");

        let started = Instant::now();
        let result = match tokio::time::timeout(
            self.config.reconcile_timeout,
            self.reconciler.reconcile(&object),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ReconcileError::Timeout {
                resource: object.to_string(),
                elapsed: started.elapsed(),
            }),
        };

        match result {
            Ok(ReconcileOutcome::Done) => {
                debug!(
                    object = %object,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Reconciled"
                );
                self.completions.on_complete(&object, true);
                Attempt::Succeeded
            }
            Ok(ReconcileOutcome::Requeue { after }) => {
                let retry_in = self.config.retry.on_requeue(after);
                debug!(
                    object = %object,
                    retry_in_ms = retry_in.as_millis() as u64,
                    "Reconciler requested requeue"
                );
                self.schedule_retry(object, retry_in, shutdown.clone());
                Attempt::Requeued { retry_in }
            }
            Err(e) => {
                let retry_in = self.config.retry.on_failure();
                warn!(
                    object = %object,
                    error = %e,
                    retry_in_ms = retry_in.as_millis() as u64,
                    "Reconcile failed, will retry"
                );
                self.schedule_retry(object.clone(), retry_in, shutdown.clone());
                self.completions.on_complete(&object, false);
                Attempt::Failed { retry_in }
            }
        }
    }

    /// Re-enqueue after `delay` from an independent timer task.
    ///
    /// The timer exits early on shutdown and performs a single
    /// non-blocking enqueue attempt otherwise.
    fn schedule_retry(&self, object: ObjectRef, delay: Duration, mut shutdown: watch::Receiver<bool>) {
        let queue = self.queue.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown_signaled(&mut shutdown) => {
                    debug!(object = %object, "Retry cancelled by shutdown");
                }
                _ = tokio::time::sleep(delay) => {
                    queue.offer(&object);
                }
            }
        });
    }
}

/// Resolves once shutdown has been signaled or the signal sender is gone.
pub(crate) async fn shutdown_signaled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
