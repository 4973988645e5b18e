//! Reconciliation capabilities.
//!
//! The coordinator never reconciles anything itself. It drives two
//! capabilities supplied by its owner:
//!
//! - **Reconciler**: converges one object against the managed system and
//!   reports success, failure, or a request to be retried later.
//! - **ScopeResolver**: used by the calling layer to derive the domain and
//!   tier of a raw object before scheduling it.
//!
//! # Invariants
//!
//! - Reconcilers must be idempotent; retries are unconditional and uncapped
//! - A failed or requeued object is always retried after a positive delay

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tiergate_id::{IdError, ObjectRef};

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The reconciler did not return within its deadline.
    #[error("timeout after {elapsed:?} waiting for {resource}")]
    Timeout {
        resource: String,
        elapsed: Duration,
    },

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Non-failing result of a single reconcile call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The object has converged.
    Done,

    /// The object is not done yet; deliver it again after `after`.
    ///
    /// A zero delay falls back to the retry policy's backoff.
    Requeue { after: Duration },
}

impl ReconcileOutcome {
    /// Requeue after the given delay.
    pub fn requeue_after(after: Duration) -> Self {
        Self::Requeue { after }
    }

    /// Returns true if the object has converged.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Reconciles a single object of one tier against the managed system.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Converge one object.
    ///
    /// Called repeatedly for the same object on failure, so it must be
    /// idempotent.
    async fn reconcile(&self, object: &ObjectRef) -> Result<ReconcileOutcome, ReconcileError>;
}

/// Errors returned when an object cannot be scoped.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The object's kind does not map to any tier.
    #[error("unsupported object kind: {0}")]
    UnsupportedKind(String),

    /// The object carries no domain.
    #[error("object has no domain: {0}")]
    MissingDomain(String),

    /// A derived name failed validation.
    #[error(transparent)]
    InvalidName(#[from] IdError),
}

/// Derives the domain and tier of a raw object.
pub trait ScopeResolver<T: ?Sized>: Send + Sync {
    fn resolve(&self, object: &T) -> Result<ObjectRef, ResolveError>;
}

/// Retry policy for failed and requeued objects.
///
/// Backoff is fixed; there is no attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before re-delivering a failed object.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a fixed backoff.
    pub fn fixed(backoff: Duration) -> Self {
        Self { backoff }
    }

    /// Delay before re-delivering a failed object.
    pub fn on_failure(&self) -> Duration {
        self.backoff
    }

    /// Delay before re-delivering an object that asked to be requeued.
    pub fn on_requeue(&self, requested: Duration) -> Duration {
        if requested.is_zero() {
            self.backoff
        } else {
            requested
        }
    }
}

/// Default per-call reconcile deadline.
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(5 * 60); // 5 minutes

/// Default delay before re-delivering a failed object.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// Default capacity of each tier's work queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default retention for completion ledger entries.
pub const DEFAULT_LEDGER_RETENTION: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Default interval between completion ledger sweeps.
pub const DEFAULT_LEDGER_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60); // 10 minutes

#[cfg(test)]
mod tests {
    use super::*;
    use tiergate_id::Tier;

    struct AlwaysDone;

    #[async_trait]
    impl Reconciler for AlwaysDone {
        fn name(&self) -> &str {
            "always-done"
        }

        async fn reconcile(
            &self,
            _object: &ObjectRef,
        ) -> Result<ReconcileOutcome, ReconcileError> {
            Ok(ReconcileOutcome::Done)
        }
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.on_failure(), Duration::from_secs(30));
    }

    #[test]
    fn test_requeue_zero_falls_back_to_backoff() {
        let policy = RetryPolicy::fixed(Duration::from_secs(7));
        assert_eq!(policy.on_requeue(Duration::ZERO), Duration::from_secs(7));
        assert_eq!(
            policy.on_requeue(Duration::from_secs(2)),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_outcome_is_done() {
        assert!(ReconcileOutcome::Done.is_done());
        assert!(!ReconcileOutcome::requeue_after(Duration::from_secs(1)).is_done());
    }

    #[test]
    fn test_timeout_error_message() {
        let err = ReconcileError::Timeout {
            resource: "east/tier1/admin".to_string(),
            elapsed: Duration::from_secs(300),
        };
        assert_eq!(
            err.to_string(),
            "timeout after 300s waiting for east/tier1/admin"
        );
    }

    #[tokio::test]
    async fn test_reconciler_trait_object() {
        let reconciler: Box<dyn Reconciler> = Box::new(AlwaysDone);
        let object = ObjectRef::from_parts("east", Tier::One, "admin").unwrap();
        let outcome = reconciler.reconcile(&object).await.unwrap();
        assert!(outcome.is_done());
        assert_eq!(reconciler.name(), "always-done");
    }
}
