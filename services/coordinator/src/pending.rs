//! Per-tier pending bookkeeping.
//!
//! A reference stays pending from the moment it is first scheduled until a
//! successful completion is reported for it. An empty or absent entry for a
//! domain is the readiness signal for the next tier.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tiergate_id::{Domain, ObjectRef, Tier};

/// Result of removing a reference from a pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// Whether the reference was pending before the call.
    pub removed: bool,

    /// References still pending for the domain afterwards.
    pub remaining: usize,
}

impl Removal {
    /// Returns true if nothing remains pending for the domain.
    pub fn is_drained(&self) -> bool {
        self.remaining == 0
    }
}

/// Outstanding references of one tier, grouped by domain in insertion order.
#[derive(Debug)]
pub struct PendingTracker {
    tier: Tier,
    entries: RwLock<HashMap<Domain, Vec<ObjectRef>>>,
}

impl PendingTracker {
    /// Create an empty tracker for a tier.
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record a reference as pending.
    ///
    /// Returns false if it was already pending.
    pub fn record(&self, object: &ObjectRef) -> bool {
        debug_assert_eq!(object.tier(), self.tier);

        let mut entries = self.write();
        let refs = entries.entry(object.domain().clone()).or_default();
        if refs.contains(object) {
            return false;
        }
        refs.push(object.clone());
        true
    }

    /// Remove a reference after a successful completion.
    ///
    /// Drops the domain entry once it is empty.
    pub fn remove(&self, object: &ObjectRef) -> Removal {
        let mut entries = self.write();
        let Some(refs) = entries.get_mut(object.domain()) else {
            return Removal {
                removed: false,
                remaining: 0,
            };
        };

        let before = refs.len();
        refs.retain(|r| r != object);
        let removal = Removal {
            removed: refs.len() < before,
            remaining: refs.len(),
        };

        if refs.is_empty() {
            entries.remove(object.domain());
        }

        removal
    }

    /// Returns true if no references are pending for the domain.
    pub fn is_ready(&self, domain: &Domain) -> bool {
        self.read().get(domain).map_or(true, Vec::is_empty)
    }

    /// Copy of the references pending for a domain, in scheduling order.
    pub fn snapshot(&self, domain: &Domain) -> Vec<ObjectRef> {
        self.read().get(domain).cloned().unwrap_or_default()
    }

    /// Returns true if the reference is pending.
    #[cfg(test)]
    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.read()
            .get(object.domain())
            .is_some_and(|refs| refs.contains(object))
    }

    /// Domains with at least one pending reference.
    #[cfg(test)]
    pub fn domains(&self) -> Vec<Domain> {
        self.read().keys().cloned().collect()
    }

    /// Total pending references across all domains.
    pub(crate) fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Guarded data is plain bookkeeping, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Domain, Vec<ObjectRef>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Domain, Vec<ObjectRef>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(domain: &str, name: &str) -> ObjectRef {
        ObjectRef::from_parts(domain, Tier::One, name).unwrap()
    }

    fn domain(name: &str) -> Domain {
        Domain::parse(name).unwrap()
    }

    #[test]
    fn test_absent_domain_is_ready() {
        let tracker = PendingTracker::new(Tier::One);
        assert!(tracker.is_ready(&domain("east")));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_record_is_idempotent() {
        let tracker = PendingTracker::new(Tier::One);
        assert!(tracker.record(&role("east", "r1")));
        assert!(!tracker.record(&role("east", "r1")));
        assert_eq!(tracker.len(), 1);
        assert!(!tracker.is_ready(&domain("east")));
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let tracker = PendingTracker::new(Tier::One);
        tracker.record(&role("east", "b"));
        tracker.record(&role("east", "a"));
        tracker.record(&role("east", "c"));

        let names: Vec<_> = tracker
            .snapshot(&domain("east"))
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_remove_drains_domain() {
        let tracker = PendingTracker::new(Tier::One);
        tracker.record(&role("east", "r1"));
        tracker.record(&role("east", "r2"));

        let first = tracker.remove(&role("east", "r1"));
        assert!(first.removed);
        assert_eq!(first.remaining, 1);
        assert!(!first.is_drained());

        let second = tracker.remove(&role("east", "r2"));
        assert!(second.is_drained());
        assert!(tracker.is_ready(&domain("east")));
        assert!(tracker.domains().is_empty());
    }

    #[test]
    fn test_remove_unknown_ref() {
        let tracker = PendingTracker::new(Tier::One);
        tracker.record(&role("east", "r1"));

        let removal = tracker.remove(&role("east", "other"));
        assert!(!removal.removed);
        assert_eq!(removal.remaining, 1);

        let removal = tracker.remove(&role("west", "r1"));
        assert!(!removal.removed);
        assert!(removal.is_drained());
    }

    #[test]
    fn test_domains_are_independent() {
        let tracker = PendingTracker::new(Tier::One);
        tracker.record(&role("east", "r1"));
        assert!(!tracker.is_ready(&domain("east")));
        assert!(tracker.is_ready(&domain("west")));
        assert!(tracker.contains(&role("east", "r1")));
        assert!(!tracker.contains(&role("west", "r1")));
    }
}
