//! Student-to-mentor assignment engine.
//!
//! # Responsibility
//! - Plan links in bulk (`bulk`) or for one new student (`incremental`).
//! - Persist planned links on both sides of the relation (`applier`).
//!
//! # Invariants
//! - Planners are pure over a snapshot and never fail; "no mentor" is an
//!   outcome, not an error.
//! - Only the applier writes mentor links.

pub mod applier;
pub mod bulk;
pub mod incremental;
