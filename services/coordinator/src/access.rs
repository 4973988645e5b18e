//! Access-control sample domain.
//!
//! Roles, grants, and users map onto tiers 1, 2, and 3: a grant needs every
//! role of its cluster, a user needs roles and grants. The simulated
//! reconciler stands in for the managed system in development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tiergate_id::{ObjectRef, Tier};
use tiergate_reconcile::{
    ReconcileError, ReconcileOutcome, Reconciler, ResolveError, ScopeResolver,
};
use tracing::{debug, info};

/// Kind of access-control object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Role,
    Grant,
    User,
}

impl AccessKind {
    pub fn tier(self) -> Tier {
        match self {
            AccessKind::Role => Tier::One,
            AccessKind::Grant => Tier::Two,
            AccessKind::User => Tier::Three,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessKind::Role => "role",
            AccessKind::Grant => "grant",
            AccessKind::User => "user",
        }
    }
}

/// A raw access-control object as seen by the watch layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessObject {
    pub kind: AccessKind,
    /// Owning cluster; becomes the scheduling domain.
    pub cluster: String,
    pub name: String,
}

impl AccessObject {
    pub fn new(kind: AccessKind, cluster: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            cluster: cluster.into(),
            name: name.into(),
        }
    }
}

/// Scopes access objects by cluster, tiered by kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessScopeResolver;

impl ScopeResolver<AccessObject> for AccessScopeResolver {
    fn resolve(&self, object: &AccessObject) -> Result<ObjectRef, ResolveError> {
        if object.cluster.is_empty() {
            return Err(ResolveError::MissingDomain(format!(
                "{} {}",
                object.kind.as_str(),
                object.name
            )));
        }
        Ok(ObjectRef::from_parts(
            &object.cluster,
            object.kind.tier(),
            &object.name,
        )?)
    }
}

/// Simulated reconciler for development and testing.
pub struct SimulatedReconciler {
    kind: AccessKind,
    latency: Duration,
    /// Attempts to fail per object before succeeding.
    failures_per_object: u32,
    attempts: Mutex<HashMap<ObjectRef, u32>>,
    total_calls: AtomicU64,
}

impl SimulatedReconciler {
    /// Create a reconciler that succeeds immediately.
    pub fn new(kind: AccessKind) -> Self {
        Self {
            kind,
            latency: Duration::ZERO,
            failures_per_object: 0,
            attempts: Mutex::new(HashMap::new()),
            total_calls: AtomicU64::new(0),
        }
    }

    /// Simulate work taking `latency` per call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the first `failures` attempts of every object.
    pub fn failing_first(mut self, failures: u32) -> Self {
        self.failures_per_object = failures;
        self
    }

    /// Total reconcile calls so far.
    pub fn calls(&self) -> u64 {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Attempts made for one object.
    pub fn attempts(&self, object: &ObjectRef) -> u32 {
        self.attempts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(object)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Reconciler for SimulatedReconciler {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn reconcile(&self, object: &ObjectRef) -> Result<ReconcileOutcome, ReconcileError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut attempts = self
                .attempts
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let count = attempts.entry(object.clone()).or_insert(0);
            *count += 1;
            *count
        };

        debug!(object = %object, attempt, "[SIM] Reconciling {}", self.kind.as_str());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if attempt <= self.failures_per_object {
            return Err(ReconcileError::Internal(format!(
                "simulated failure {attempt}/{} for {object}",
                self.failures_per_object
            )));
        }

        info!(object = %object, attempt, "[SIM] Provisioned {}", self.kind.as_str());
        Ok(ReconcileOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_maps_kinds_to_tiers() {
        let resolver = AccessScopeResolver;
        for (kind, tier) in [
            (AccessKind::Role, Tier::One),
            (AccessKind::Grant, Tier::Two),
            (AccessKind::User, Tier::Three),
        ] {
            let object = resolver
                .resolve(&AccessObject::new(kind, "east", "x"))
                .unwrap();
            assert_eq!(object.tier(), tier);
            assert_eq!(object.domain().as_str(), "east");
        }
    }

    #[test]
    fn test_resolver_missing_cluster() {
        let result = AccessScopeResolver.resolve(&AccessObject::new(AccessKind::Role, "", "x"));
        assert!(matches!(result, Err(ResolveError::MissingDomain(_))));
    }

    #[test]
    fn test_resolver_invalid_name() {
        let result =
            AccessScopeResolver.resolve(&AccessObject::new(AccessKind::Role, "east", "a b"));
        assert!(matches!(result, Err(ResolveError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_simulated_failures_then_success() {
        let reconciler = SimulatedReconciler::new(AccessKind::Role).failing_first(2);
        let object = ObjectRef::from_parts("east", Tier::One, "admin").unwrap();

        assert!(reconciler.reconcile(&object).await.is_err());
        assert!(reconciler.reconcile(&object).await.is_err());
        assert!(reconciler.reconcile(&object).await.unwrap().is_done());
        assert_eq!(reconciler.attempts(&object), 3);
        assert_eq!(reconciler.calls(), 3);
    }
}
