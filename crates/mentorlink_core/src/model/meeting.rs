//! Mentor/student meetings and the per-student progress report.
//!
//! # Responsibility
//! - Define the meeting record and its status lifecycle.
//! - Aggregate completed meetings into a progress report.
//!
//! # Invariants
//! - A meeting always links exactly one mentor and one student.
//! - `scheduled_at` is Unix epoch milliseconds (UTC).
//! - Durations are whole minutes and never zero.

use crate::model::person::PersonId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type MeetingId = Uuid;

/// Completed meetings listed in `ProgressReport::recent`.
pub const RECENT_MEETINGS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl Display for MeetingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub mentor_id: PersonId,
    pub student_id: PersonId,
    pub title: String,
    pub description: String,
    pub scheduled_at: i64,
    pub duration_minutes: u32,
    pub meeting_link: Option<String>,
    pub status: MeetingStatus,
    /// Unix epoch milliseconds, assigned by the store on insert.
    pub created_at: Option<i64>,
}

impl Meeting {
    /// Creates a `scheduled` meeting with a generated ID.
    pub fn new(
        mentor_id: PersonId,
        student_id: PersonId,
        title: impl Into<String>,
        scheduled_at: i64,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            mentor_id,
            student_id,
            title: title.into().trim().to_string(),
            description: String::new(),
            scheduled_at,
            duration_minutes,
            meeting_link: None,
            status: MeetingStatus::Scheduled,
            created_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into().trim().to_string();
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.meeting_link = Some(link.into().trim().to_string());
        self
    }

    pub fn validate(&self) -> Result<(), MeetingValidationError> {
        if self.title.trim().is_empty() {
            return Err(MeetingValidationError::EmptyTitle);
        }
        if self.duration_minutes == 0 {
            return Err(MeetingValidationError::ZeroDuration);
        }
        if self.mentor_id == self.student_id {
            return Err(MeetingValidationError::SameParticipant(self.mentor_id));
        }
        if DateTime::<Utc>::from_timestamp_millis(self.scheduled_at).is_none() {
            return Err(MeetingValidationError::InvalidTime(self.scheduled_at));
        }
        Ok(())
    }

    pub fn scheduled_time(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.scheduled_at)
    }

    /// `YYYY-MM` bucket of the scheduled time.
    pub fn month_key(&self) -> Option<String> {
        self.scheduled_time()
            .map(|time| time.format("%Y-%m").to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingValidationError {
    EmptyTitle,
    ZeroDuration,
    SameParticipant(PersonId),
    InvalidTime(i64),
}

impl Display for MeetingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "meeting title cannot be empty"),
            Self::ZeroDuration => write!(f, "meeting duration must be at least one minute"),
            Self::SameParticipant(id) => write!(f, "person {id} cannot meet themselves"),
            Self::InvalidTime(ms) => write!(f, "meeting time {ms} is out of range"),
        }
    }
}

impl Error for MeetingValidationError {}

/// Completed meetings of one calendar month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyMeetings {
    pub meetings: u32,
    pub duration_minutes: u64,
}

/// Meeting statistics for one student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub student_id: PersonId,
    pub total_completed: u32,
    pub total_duration_minutes: u64,
    /// Scheduled meetings that have not started yet.
    pub upcoming_scheduled: u64,
    pub cancelled: u64,
    /// Latest completed meetings first, at most `RECENT_MEETINGS`.
    pub recent: Vec<Meeting>,
    /// Keyed by `YYYY-MM`.
    pub by_month: BTreeMap<String, MonthlyMeetings>,
}

impl ProgressReport {
    /// Builds the report from `completed` meetings ordered latest first.
    pub fn from_completed(
        student_id: PersonId,
        completed: Vec<Meeting>,
        upcoming_scheduled: u64,
        cancelled: u64,
    ) -> Self {
        let mut by_month: BTreeMap<String, MonthlyMeetings> = BTreeMap::new();
        let mut total_duration_minutes = 0_u64;
        for meeting in &completed {
            let minutes = u64::from(meeting.duration_minutes);
            total_duration_minutes += minutes;
            if let Some(month) = meeting.month_key() {
                let bucket = by_month.entry(month).or_default();
                bucket.meetings += 1;
                bucket.duration_minutes += minutes;
            }
        }

        Self {
            student_id,
            total_completed: u32::try_from(completed.len()).unwrap_or(u32::MAX),
            total_duration_minutes,
            upcoming_scheduled,
            cancelled,
            recent: completed.into_iter().take(RECENT_MEETINGS).collect(),
            by_month,
        }
    }

    pub fn total_hours(&self) -> u64 {
        self.total_duration_minutes / 60
    }

    /// Minutes left over after `total_hours`.
    pub fn remaining_minutes(&self) -> u64 {
        self.total_duration_minutes % 60
    }

    /// Mean completed duration rounded to the nearest minute; 0 with no meetings.
    pub fn average_duration_minutes(&self) -> u64 {
        if self.total_completed == 0 {
            return 0;
        }
        let count = u64::from(self.total_completed);
        (self.total_duration_minutes + count / 2) / count
    }
}
