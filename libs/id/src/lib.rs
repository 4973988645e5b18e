//! # tiergate-id
//!
//! Identity types for objects scheduled through the tiergate coordinator.
//!
//! ## Design Principles
//!
//! - Domains group objects that must observe tier ordering; nothing is
//!   ordered across domains
//! - Every schedulable unit is named by an [`ObjectRef`] that never changes
//!   tier once created
//! - All names have a canonical string form with strict parsing
//!   (parse → format → parse is stable)
//!
//! ## Reference Format
//!
//! Object references are written `{domain}/{tier}/{name}`:
//! - `east/tier1/db-admin`
//! - `east/tier2/db-admin-on-orders`
//! - `west/tier3/alice`

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use macros::MAX_NAME_LEN;
pub use types::*;
