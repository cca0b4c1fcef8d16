//! Core domain logic for the MentorLink mentorship platform.
//! This crate is the single source of truth for mentor assignment invariants.

pub mod assign;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use assign::applier::{AssignError, AssignmentApplier};
pub use assign::bulk::{plan_bulk, AssignmentPair, BulkPlan, SkippedGroup};
pub use assign::incremental::{plan_one, PlanOutcome};
pub use config::{ConfigError, CoreConfig};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
    LoggingError,
};
pub use model::category::{average_score, category, classify, Category};
pub use model::meeting::{
    Meeting, MeetingId, MeetingStatus, MeetingValidationError, MonthlyMeetings, ProgressReport,
};
pub use model::message::{Message, MessageId, MessageValidationError};
pub use model::notification::{Notification, NotificationId, NotificationKind, RelatedType};
pub use model::person::{
    Branch, Person, PersonId, PersonValidationError, Role, StudentProfile, TermScores,
};
pub use repo::meeting_repo::{MeetingRepository, SqliteMeetingRepository};
pub use repo::message_repo::{MessageRepository, SqliteMessageRepository};
pub use repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
pub use repo::person_repo::{
    PersonListQuery, PersonRepository, RepoError, RepoResult, SqlitePersonRepository,
};
pub use service::assignment_service::{
    AssignmentService, AssignmentStatus, BulkAssignmentReport, RegistrationOutcome,
};
pub use service::meeting_service::{MeetingService, MeetingServiceError};
pub use service::message_service::{MessageService, MessageServiceError};
pub use service::notification_service::{
    NoopNotifier, NotificationService, Notifier, NotifyError,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
