//! tiergate
//!
//! Runs the tier-ordered coordinator against simulated access-control
//! reconcilers (roles, then grants, then users) and feeds it a demo
//! workload until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tiergate_coordinator::{
    access::{AccessKind, AccessObject, AccessScopeResolver, SimulatedReconciler},
    config::CoordinatorConfig,
    dispatch::Dispatcher,
    Coordinator, Reconcilers,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = CoordinatorConfig::from_env().context("Invalid coordinator configuration")?;

    // Initialize tracing (prefer RUST_LOG, fallback to TIERGATE_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting tiergate coordinator");
    info!(
        queue_capacity = config.queue_capacity,
        reconcile_timeout_secs = config.reconcile_timeout.as_secs(),
        "Configuration loaded"
    );

    let reconcilers = Reconcilers::new(
        Arc::new(SimulatedReconciler::new(AccessKind::Role).with_latency(Duration::from_millis(200))),
        Arc::new(
            SimulatedReconciler::new(AccessKind::Grant)
                .with_latency(Duration::from_millis(100))
                .failing_first(1),
        ),
        Arc::new(SimulatedReconciler::new(AccessKind::User).with_latency(Duration::from_millis(50))),
    );

    let coordinator = Coordinator::new(config, reconcilers);
    coordinator.start()?;

    // Work arrives out of order on purpose: users and grants before roles.
    let dispatcher = Dispatcher::new(coordinator.clone(), AccessScopeResolver);
    let workload = [
        AccessObject::new(AccessKind::User, "east", "alice"),
        AccessObject::new(AccessKind::Grant, "east", "admin-on-orders"),
        AccessObject::new(AccessKind::Role, "east", "admin"),
        AccessObject::new(AccessKind::Role, "east", "reader"),
        AccessObject::new(AccessKind::Grant, "west", "reader-on-logs"),
        AccessObject::new(AccessKind::User, "west", "bob"),
    ];
    let stats = dispatcher.dispatch_all(&workload);
    info!(
        scheduled = stats.scheduled,
        rejected = stats.rejected,
        "Demo workload dispatched"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received shutdown signal");

    coordinator.stop_and_wait(Duration::from_secs(10)).await;

    info!(
        ledger_entries = coordinator.ledger().len(),
        "tiergate shutdown complete"
    );
    Ok(())
}
