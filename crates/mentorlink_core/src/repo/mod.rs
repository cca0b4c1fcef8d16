//! Record-store abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define the data access contracts the assignment engine and the
//!   messaging and meeting services depend on.
//! - Isolate SQLite query details from planners and services.
//!
//! # Invariants
//! - Repository writes enforce model validation before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod meeting_repo;
pub mod message_repo;
pub mod notification_repo;
pub mod person_repo;
