//! tiergate coordinator library.
//!
//! Schedules reconciliation of three tiers of managed objects per domain,
//! releasing each tier only once every lower tier has settled for that
//! domain.
//!
//! ## Architecture
//!
//! ```text
//! Coordinator
//! ├── PendingTracker x3   (per-tier outstanding refs, by domain)
//! ├── WorkQueue x3        (bounded, drop-on-full)
//! ├── StageWorker x3      (one sequential consumer per tier)
//! └── CompletionLedger    (audit only, swept periodically)
//! ```
//!
//! ## Modules
//!
//! - `coordinator`: scheduling, readiness, cascade, and lifecycle
//! - `worker`: per-tier queue consumer with retry timers
//! - `pending`: per-tier pending bookkeeping
//! - `queue`: bounded work queue
//! - `ledger`: completion ledger and its sweep worker
//! - `dispatch`: scope-resolver driven routing for the calling layer
//! - `access`: access-control sample domain (roles, grants, users)

pub mod access;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod pending;
pub mod queue;
pub mod worker;

pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, Reconcilers};
pub use error::CoordinatorError;
pub use tiergate_id::{Domain, ObjectName, ObjectRef, Tier};
