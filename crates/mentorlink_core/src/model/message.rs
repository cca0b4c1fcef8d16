//! Direct and broadcast chat messages.
//!
//! # Invariants
//! - A message has exactly one sender and one receiver; a broadcast is
//!   stored as one row per receiver.
//! - `content` is stored trimmed and non-empty.
//! - Only the receiver can flip `is_read`.

use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type MessageId = Uuid;

/// Characters of message content kept in notification previews.
pub const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: PersonId,
    pub receiver_id: PersonId,
    pub content: String,
    pub is_broadcast: bool,
    pub is_read: bool,
    /// Unix epoch milliseconds, assigned by the store on insert.
    pub created_at: Option<i64>,
}

impl Message {
    /// Creates an unread direct message with a generated ID.
    pub fn new(sender_id: PersonId, receiver_id: PersonId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content: content.into().trim().to_string(),
            is_broadcast: false,
            is_read: false,
            created_at: None,
        }
    }

    /// Creates one receiver's copy of a broadcast.
    pub fn broadcast(sender_id: PersonId, receiver_id: PersonId, content: impl Into<String>) -> Self {
        Self {
            is_broadcast: true,
            ..Self::new(sender_id, receiver_id, content)
        }
    }

    pub fn validate(&self) -> Result<(), MessageValidationError> {
        if self.content.trim().is_empty() {
            return Err(MessageValidationError::EmptyContent);
        }
        if self.sender_id == self.receiver_id {
            return Err(MessageValidationError::SelfAddressed(self.sender_id));
        }
        Ok(())
    }

    pub fn preview(&self) -> String {
        preview(&self.content)
    }
}

/// Shortens `content` to `PREVIEW_CHARS` characters, marking the cut with `...`.
pub fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }
    let mut short: String = content.chars().take(PREVIEW_CHARS).collect();
    short.push_str("...");
    short
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageValidationError {
    EmptyContent,
    SelfAddressed(PersonId),
}

impl Display for MessageValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "message content cannot be empty"),
            Self::SelfAddressed(id) => write!(f, "person {id} cannot message themselves"),
        }
    }
}

impl Error for MessageValidationError {}
