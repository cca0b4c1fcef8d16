//! Domain model for mentor/student accounts, their messages, meetings and
//! notifications.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Derive the performance category that drives bulk partitioning.
//!
//! # Invariants
//! - Every account is identified by a stable `PersonId`.
//! - The mentor/student relation is stored as plain identifiers on both
//!   sides, never as nested records.

pub mod category;
pub mod meeting;
pub mod message;
pub mod notification;
pub mod person;
