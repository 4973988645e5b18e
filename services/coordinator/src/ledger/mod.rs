//! Completion ledger.
//!
//! Records the last successful completion time of each reference. The
//! ledger is audit-only: nothing in scheduling reads it.

mod worker;

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tiergate_id::ObjectRef;

pub use worker::{LedgerSweepConfig, LedgerSweeper};

/// Last-success timestamps by object reference.
#[derive(Debug, Default)]
pub struct CompletionLedger {
    entries: RwLock<HashMap<ObjectRef, DateTime<Utc>>>,
}

impl CompletionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a success now.
    pub fn record(&self, object: &ObjectRef) {
        self.record_at(object, Utc::now());
    }

    /// Record a success at an explicit time.
    pub fn record_at(&self, object: &ObjectRef, at: DateTime<Utc>) {
        self.write().insert(object.clone(), at);
    }

    /// Last recorded success for a reference.
    pub fn last_success(&self, object: &ObjectRef) -> Option<DateTime<Utc>> {
        self.read().get(object).copied()
    }

    /// Remove entries older than `retention`, returning how many were removed.
    pub fn purge_older_than(&self, retention: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            return 0;
        };
        self.purge_before(cutoff)
    }

    /// Remove entries recorded strictly before `cutoff`.
    pub fn purge_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, at| *at >= cutoff);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ObjectRef, DateTime<Utc>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ObjectRef, DateTime<Utc>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiergate_id::Tier;

    fn object(name: &str) -> ObjectRef {
        ObjectRef::from_parts("east", Tier::One, name).unwrap()
    }

    #[test]
    fn test_record_and_lookup() {
        let ledger = CompletionLedger::new();
        assert!(ledger.last_success(&object("r1")).is_none());

        ledger.record(&object("r1"));
        assert!(ledger.last_success(&object("r1")).is_some());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_record_overwrites() {
        let ledger = CompletionLedger::new();
        let old = Utc::now() - chrono::Duration::hours(3);
        ledger.record_at(&object("r1"), old);
        ledger.record(&object("r1"));

        assert_eq!(ledger.len(), 1);
        assert!(ledger.last_success(&object("r1")).unwrap() > old);
    }

    #[test]
    fn test_purge_older_than() {
        let ledger = CompletionLedger::new();
        ledger.record_at(&object("stale"), Utc::now() - chrono::Duration::hours(2));
        ledger.record(&object("fresh"));

        let purged = ledger.purge_older_than(Duration::from_secs(3600));
        assert_eq!(purged, 1);
        assert!(ledger.last_success(&object("stale")).is_none());
        assert!(ledger.last_success(&object("fresh")).is_some());
    }

    #[test]
    fn test_purge_with_huge_retention_keeps_everything() {
        let ledger = CompletionLedger::new();
        ledger.record(&object("r1"));
        assert_eq!(ledger.purge_older_than(Duration::MAX), 0);
        assert_eq!(ledger.len(), 1);
    }
}
