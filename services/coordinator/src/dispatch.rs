//! Routing raw objects to the coordinator.
//!
//! The calling layer (watchers, event handlers) knows raw objects, not
//! references. A [`ScopeResolver`] turns each object into an [`ObjectRef`]
//! and the dispatcher calls the schedule entry point of the resolved tier.

use tiergate_id::{ObjectRef, Tier};
use tiergate_reconcile::{ResolveError, ScopeResolver};
use tracing::warn;

use crate::coordinator::Coordinator;

/// Counts from a batch dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub scheduled: usize,
    pub rejected: usize,
}

/// Resolves raw objects and schedules them on a coordinator.
pub struct Dispatcher<R> {
    coordinator: Coordinator,
    resolver: R,
}

impl<R> Dispatcher<R> {
    pub fn new(coordinator: Coordinator, resolver: R) -> Self {
        Self {
            coordinator,
            resolver,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Resolve and schedule one object.
    pub fn dispatch<T>(&self, object: &T) -> Result<ObjectRef, ResolveError>
    where
        T: ?Sized,
        R: ScopeResolver<T>,
    {
        let object = self.resolver.resolve(object)?;
        match object.tier() {
            Tier::One => self.coordinator.schedule_tier1(object.clone()),
            Tier::Two => self.coordinator.schedule_tier2(object.clone()),
            Tier::Three => self.coordinator.schedule_tier3(object.clone()),
        }
        Ok(object)
    }

    /// Dispatch a batch, logging and counting objects that fail to resolve.
    pub fn dispatch_all<'a, T, I>(&self, objects: I) -> DispatchStats
    where
        T: std::fmt::Debug + 'a,
        I: IntoIterator<Item = &'a T>,
        R: ScopeResolver<T>,
    {
        let mut stats = DispatchStats::default();
        for object in objects {
            match self.dispatch(object) {
                Ok(_) => stats.scheduled += 1,
                Err(e) => {
                    warn!(object = ?object, error = %e, "Skipping object that could not be scoped");
                    stats.rejected += 1;
                }
            }
        }
        stats
    }
}
