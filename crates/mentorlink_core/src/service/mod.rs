//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repositories, planners and the applier into use-case APIs.
//! - Keep outer layers (HTTP, CLI) decoupled from storage details.

pub mod assignment_service;
pub mod meeting_service;
pub mod message_service;
pub mod notification_service;
