//! Coordinator configuration.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tiergate_reconcile::{
    RetryPolicy, DEFAULT_LEDGER_RETENTION, DEFAULT_LEDGER_SWEEP_INTERVAL, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_RECONCILE_TIMEOUT, DEFAULT_RETRY_BACKOFF,
};

/// Coordinator configuration (env-driven).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Capacity of each tier's work queue.
    pub queue_capacity: usize,

    /// Deadline for a single reconcile call.
    pub reconcile_timeout: Duration,

    /// Retry policy for failed and requeued objects.
    pub retry: RetryPolicy,

    /// How long completion ledger entries are kept.
    pub ledger_retention: Duration,

    /// Interval between completion ledger sweeps.
    pub ledger_sweep_interval: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
            retry: RetryPolicy::fixed(DEFAULT_RETRY_BACKOFF),
            ledger_retention: DEFAULT_LEDGER_RETENTION,
            ledger_sweep_interval: DEFAULT_LEDGER_SWEEP_INTERVAL,
            log_level: "info".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let queue_capacity = env_parse::<usize>("TIERGATE_QUEUE_CAPACITY")?
            .unwrap_or(defaults.queue_capacity);
        if queue_capacity == 0 {
            bail!("TIERGATE_QUEUE_CAPACITY must be greater than zero.");
        }

        let reconcile_timeout = env_parse::<u64>("TIERGATE_RECONCILE_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.reconcile_timeout)
            .max(Duration::from_secs(1));

        let retry_backoff = env_parse::<u64>("TIERGATE_RETRY_BACKOFF_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.backoff)
            .max(Duration::from_millis(10));

        let ledger_retention = env_parse::<u64>("TIERGATE_LEDGER_RETENTION_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.ledger_retention);

        let ledger_sweep_interval = env_parse::<u64>("TIERGATE_LEDGER_SWEEP_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.ledger_sweep_interval)
            .max(Duration::from_secs(1));

        let log_level =
            std::env::var("TIERGATE_LOG_LEVEL").unwrap_or_else(|_| defaults.log_level.clone());

        Ok(Self {
            queue_capacity,
            reconcile_timeout,
            retry: RetryPolicy::fixed(retry_backoff),
            ledger_retention,
            ledger_sweep_interval,
            log_level,
        })
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .ok()
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("{key} must be a non-negative integer."))
}
