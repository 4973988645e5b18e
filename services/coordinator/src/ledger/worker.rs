use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, instrument};

use tiergate_reconcile::{DEFAULT_LEDGER_RETENTION, DEFAULT_LEDGER_SWEEP_INTERVAL};

use super::CompletionLedger;

#[derive(Debug, Clone)]
pub struct LedgerSweepConfig {
    pub interval: Duration,
    pub retention: Duration,
}

impl Default for LedgerSweepConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_LEDGER_SWEEP_INTERVAL,
            retention: DEFAULT_LEDGER_RETENTION,
        }
    }
}

/// Periodically purges expired completion ledger entries.
pub struct LedgerSweeper {
    ledger: Arc<CompletionLedger>,
    config: LedgerSweepConfig,
}

impl LedgerSweeper {
    pub fn new(ledger: Arc<CompletionLedger>, config: LedgerSweepConfig) -> Self {
        Self { ledger, config }
    }

    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            retention_secs = self.config.retention.as_secs(),
            "Starting ledger sweeper"
        );

        if *shutdown.borrow() {
            return;
        }

        let mut interval = tokio::time::interval(self.config.interval);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Ledger sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Run a single sweep pass.
    pub fn sweep(&self) -> usize {
        let purged = self.ledger.purge_older_than(self.config.retention);
        if purged > 0 {
            info!(purged, remaining = self.ledger.len(), "Purged expired ledger entries");
        } else {
            debug!("Ledger sweep found nothing to purge");
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tiergate_id::{ObjectRef, Tier};

    #[test]
    fn test_config_defaults() {
        let config = LedgerSweepConfig::default();
        assert_eq!(config.interval.as_secs(), 600);
        assert_eq!(config.retention.as_secs(), 3600);
    }

    #[tokio::test]
    async fn test_sweeper_purges_on_tick_and_stops() {
        let ledger = Arc::new(CompletionLedger::new());
        let stale = ObjectRef::from_parts("east", Tier::One, "stale").unwrap();
        ledger.record_at(&stale, Utc::now() - chrono::Duration::minutes(5));

        let sweeper = LedgerSweeper::new(
            Arc::clone(&ledger),
            LedgerSweepConfig {
                interval: Duration::from_millis(20),
                retention: Duration::from_secs(60),
            },
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(ledger.is_empty());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
