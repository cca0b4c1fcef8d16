//! Chat use-cases between mentors and students.
//!
//! # Responsibility
//! - Validate participants before a message is stored.
//! - Fan a mentor broadcast out to that mentor's current students.
//! - Announce new messages through the injected `Notifier`.
//!
//! # Invariants
//! - Both participants of a direct message must exist.
//! - Only mentors broadcast, and only to their own students.
//! - Notification failures are logged and otherwise ignored.

use crate::model::message::{Message, MessageId};
use crate::model::notification::RelatedType;
use crate::model::person::{Person, PersonId, Role};
use crate::repo::message_repo::{MessageRepository, DEFAULT_MESSAGE_LIMIT};
use crate::repo::person_repo::{PersonListQuery, PersonRepository, RepoError};
use crate::service::notification_service::Notifier;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum MessageServiceError {
    /// Person or message does not exist.
    NotFound(Uuid),
    /// Operation needs a mentor.
    NotMentor { person_id: PersonId, actual: Role },
    Repo(RepoError),
}

impl Display for MessageServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::NotMentor { person_id, actual } => {
                write!(f, "person {person_id} is a {actual}, not a mentor")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MessageServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MessageServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type MessageServiceResult<T> = Result<T, MessageServiceError>;

pub struct MessageService<P: PersonRepository, M: MessageRepository, N: Notifier> {
    persons: P,
    messages: M,
    notifier: N,
}

impl<P: PersonRepository, M: MessageRepository, N: Notifier> MessageService<P, M, N> {
    pub fn new(persons: P, messages: M, notifier: N) -> Self {
        Self {
            persons,
            messages,
            notifier,
        }
    }

    /// Stores a direct message and notifies the receiver.
    pub fn send(
        &self,
        sender_id: PersonId,
        receiver_id: PersonId,
        content: &str,
    ) -> MessageServiceResult<Message> {
        let sender = self.require_person(sender_id)?;
        self.require_person(receiver_id)?;

        let message = Message::new(sender_id, receiver_id, content);
        self.messages.create_message(&message)?;
        info!(
            "event=message_send module=service status=ok message_id={} sender_id={} receiver_id={}",
            message.id, sender_id, receiver_id
        );

        self.announce(&sender, &message, "New message from");
        Ok(message)
    }

    /// Sends one copy of `content` to every student of the mentor.
    ///
    /// A mentor without students gets an empty result and nothing is stored.
    pub fn broadcast(&self, mentor_id: PersonId, content: &str) -> MessageServiceResult<Vec<Message>> {
        let mentor = self.require_person(mentor_id)?;
        if mentor.role != Role::Mentor {
            return Err(MessageServiceError::NotMentor {
                person_id: mentor_id,
                actual: mentor.role,
            });
        }

        let students = self
            .persons
            .list_persons(&PersonListQuery::students_of(mentor_id))?;
        let batch: Vec<Message> = students
            .iter()
            .map(|student| Message::broadcast(mentor_id, student.id, content))
            .collect();
        if batch.is_empty() {
            info!(
                "event=message_broadcast module=service status=skipped reason=no_students mentor_id={}",
                mentor_id
            );
            return Ok(batch);
        }

        let stored = self.messages.create_messages(&batch)?;
        info!(
            "event=message_broadcast module=service status=ok mentor_id={} receivers={}",
            mentor_id, stored
        );

        for message in &batch {
            self.announce(&mentor, message, "Broadcast message from");
        }
        Ok(batch)
    }

    /// Messages sent or received by `person_id`, newest first.
    pub fn inbox(
        &self,
        person_id: PersonId,
        limit: Option<u32>,
    ) -> MessageServiceResult<Vec<Message>> {
        self.require_person(person_id)?;
        Ok(self
            .messages
            .list_for_person(person_id, limit.unwrap_or(DEFAULT_MESSAGE_LIMIT))?)
    }

    /// Opens the conversation with `other_id`: marks what `other_id` sent to
    /// the viewer as read, then returns the thread oldest first.
    pub fn conversation(
        &self,
        viewer_id: PersonId,
        other_id: PersonId,
    ) -> MessageServiceResult<Vec<Message>> {
        self.require_person(viewer_id)?;
        self.require_person(other_id)?;

        let marked = self.messages.mark_conversation_read(viewer_id, other_id)?;
        if marked > 0 {
            info!(
                "event=message_read module=service status=ok receiver_id={} sender_id={} count={}",
                viewer_id, other_id, marked
            );
        }
        Ok(self.messages.conversation(viewer_id, other_id)?)
    }

    pub fn unread_count(&self, person_id: PersonId) -> MessageServiceResult<u64> {
        Ok(self.messages.unread_count(person_id)?)
    }

    /// Marks one received message as read. Messages addressed to someone
    /// else report `NotFound`.
    pub fn mark_read(&self, receiver_id: PersonId, id: MessageId) -> MessageServiceResult<()> {
        Ok(self.messages.mark_read(receiver_id, id)?)
    }

    fn require_person(&self, id: PersonId) -> MessageServiceResult<Person> {
        self.persons
            .get_person(id)?
            .ok_or(MessageServiceError::NotFound(id))
    }

    fn announce(&self, sender: &Person, message: &Message, title_prefix: &str) {
        let title = format!("{title_prefix} {}", sender.name);
        if let Err(err) = self.notifier.notify_related(
            message.receiver_id,
            &title,
            &message.preview(),
            RelatedType::Message,
            Some(message.id),
        ) {
            warn!(
                "event=message_notify module=service status=error message_id={} receiver_id={} error={}",
                message.id, message.receiver_id, err
            );
        }
    }
}
