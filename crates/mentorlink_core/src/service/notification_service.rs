//! Notification delivery seam and in-app notification use-cases.
//!
//! # Responsibility
//! - Define `Notifier`, the explicit dependency through which assignments,
//!   messages and meetings are announced.
//! - Provide the stored (in-app) notifier plus inbox operations.
//!
//! # Invariants
//! - Notifiers are fire-and-forget from the caller's perspective: a failed
//!   notification never rolls back the write that triggered it.

use crate::model::notification::{Notification, NotificationId, NotificationKind, RelatedType};
use crate::model::person::PersonId;
use crate::repo::notification_repo::{NotificationRepository, DEFAULT_NOTIFICATION_LIMIT};
use crate::repo::person_repo::{RepoError, RepoResult};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum NotifyError {
    Repo(RepoError),
    /// Delivery channel rejected or dropped the notification.
    Transport(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Transport(message) => write!(f, "notification transport failed: {message}"),
        }
    }
}

impl Error for NotifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Transport(_) => None,
        }
    }
}

impl From<RepoError> for NotifyError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Delivers a human-readable message to one recipient.
pub trait Notifier {
    fn notify(&self, recipient: PersonId, title: &str, message: &str) -> Result<(), NotifyError>;

    /// Like `notify`, pointing at the message or meeting that caused it.
    /// Channels without links fall back to `notify`.
    fn notify_related(
        &self,
        recipient: PersonId,
        title: &str,
        message: &str,
        _related_type: RelatedType,
        _related_id: Option<Uuid>,
    ) -> Result<(), NotifyError> {
        self.notify(recipient, title, message)
    }
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, recipient: PersonId, title: &str, message: &str) -> Result<(), NotifyError> {
        (**self).notify(recipient, title, message)
    }

    fn notify_related(
        &self,
        recipient: PersonId,
        title: &str,
        message: &str,
        related_type: RelatedType,
        related_id: Option<Uuid>,
    ) -> Result<(), NotifyError> {
        (**self).notify_related(recipient, title, message, related_type, related_id)
    }
}

/// Notifier that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _recipient: PersonId, _title: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Inbox use-cases over a notification repository.
pub struct NotificationService<R: NotificationRepository> {
    repo: R,
}

impl<R: NotificationRepository> NotificationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create(&self, notification: &Notification) -> RepoResult<NotificationId> {
        self.repo.create_notification(notification)
    }

    /// Newest first. `None` uses `DEFAULT_NOTIFICATION_LIMIT`.
    pub fn list(&self, recipient: PersonId, limit: Option<u32>) -> RepoResult<Vec<Notification>> {
        self.repo
            .list_for_recipient(recipient, limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT))
    }

    pub fn unread_count(&self, recipient: PersonId) -> RepoResult<u64> {
        self.repo.unread_count(recipient)
    }

    pub fn mark_read(&self, recipient: PersonId, id: NotificationId) -> RepoResult<()> {
        self.repo.mark_read(recipient, id)
    }

    pub fn mark_all_read(&self, recipient: PersonId) -> RepoResult<u64> {
        self.repo.mark_all_read(recipient)
    }
}

/// Stores plain notifications as `success` system notices. Message
/// notifications are `info`; meeting notifications are `success`.
impl<R: NotificationRepository> Notifier for NotificationService<R> {
    fn notify(&self, recipient: PersonId, title: &str, message: &str) -> Result<(), NotifyError> {
        self.notify_related(recipient, title, message, RelatedType::System, None)
    }

    fn notify_related(
        &self,
        recipient: PersonId,
        title: &str,
        message: &str,
        related_type: RelatedType,
        related_id: Option<Uuid>,
    ) -> Result<(), NotifyError> {
        let kind = match related_type {
            RelatedType::Message => NotificationKind::Info,
            RelatedType::Meeting | RelatedType::System => NotificationKind::Success,
        };
        let notification = Notification::new(recipient, title, message)
            .with_kind(kind)
            .related_to(related_type, related_id);
        self.repo.create_notification(&notification)?;
        Ok(())
    }
}
