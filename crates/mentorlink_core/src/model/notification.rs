//! In-app notification record.
//!
//! # Invariants
//! - A notification always has exactly one recipient.
//! - `title` and `message` are stored trimmed and non-empty.

use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type NotificationId = Uuid;

/// Severity shown next to a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Info,
    Warning,
    Success,
    Error,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Kind of document a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedType {
    Message,
    Meeting,
    System,
}

impl RelatedType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Meeting => "meeting",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "message" => Some(Self::Message),
            "meeting" => Some(Self::Meeting),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: PersonId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_type: Option<RelatedType>,
    pub related_id: Option<Uuid>,
    pub is_read: bool,
    /// Unix epoch milliseconds, assigned by the store on insert.
    pub created_at: Option<i64>,
}

impl Notification {
    /// Creates an unread `info` notification with a generated ID.
    pub fn new(recipient_id: PersonId, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            title: title.into().trim().to_string(),
            message: message.into().trim().to_string(),
            kind: NotificationKind::Info,
            related_type: None,
            related_id: None,
            is_read: false,
            created_at: None,
        }
    }

    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn related_to(mut self, related_type: RelatedType, related_id: Option<Uuid>) -> Self {
        self.related_type = Some(related_type);
        self.related_id = related_id;
        self
    }

    pub fn validate(&self) -> Result<(), NotificationValidationError> {
        if self.title.trim().is_empty() {
            return Err(NotificationValidationError::EmptyTitle);
        }
        if self.message.trim().is_empty() {
            return Err(NotificationValidationError::EmptyMessage);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationValidationError {
    EmptyTitle,
    EmptyMessage,
}

impl Display for NotificationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "notification title cannot be empty"),
            Self::EmptyMessage => write!(f, "notification message cannot be empty"),
        }
    }
}

impl Error for NotificationValidationError {}
