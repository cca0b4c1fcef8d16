//! Meeting scheduling and progress reporting.
//!
//! # Responsibility
//! - Schedule meetings between a mentor and a student and announce them.
//! - Build per-student progress reports from completed meetings.
//!
//! # Invariants
//! - `mentor_id` names a mentor and `student_id` names a student.
//! - Only the student or a mentor may read a student's progress report.
//! - Notification failures are logged and otherwise ignored.

use crate::model::meeting::{Meeting, MeetingId, MeetingStatus, ProgressReport};
use crate::model::notification::RelatedType;
use crate::model::person::{Person, PersonId, Role};
use crate::repo::meeting_repo::MeetingRepository;
use crate::repo::person_repo::{PersonRepository, RepoError};
use crate::service::notification_service::Notifier;
use chrono::Utc;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum MeetingServiceError {
    /// Participant has the wrong role for its slot.
    InvalidRole {
        person_id: PersonId,
        expected: Role,
        actual: Role,
    },
    /// Person or meeting does not exist.
    NotFound(Uuid),
    /// Viewer may not read the requested report.
    Forbidden { viewer_id: PersonId },
    Repo(RepoError),
}

impl Display for MeetingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRole {
                person_id,
                expected,
                actual,
            } => write!(f, "person {person_id} is a {actual}, expected a {expected}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Forbidden { viewer_id } => {
                write!(f, "person {viewer_id} may not view this progress report")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MeetingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MeetingServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type MeetingServiceResult<T> = Result<T, MeetingServiceError>;

pub struct MeetingService<P: PersonRepository, M: MeetingRepository, N: Notifier> {
    persons: P,
    meetings: M,
    notifier: N,
}

impl<P: PersonRepository, M: MeetingRepository, N: Notifier> MeetingService<P, M, N> {
    pub fn new(persons: P, meetings: M, notifier: N) -> Self {
        Self {
            persons,
            meetings,
            notifier,
        }
    }

    /// Stores a meeting and notifies both participants.
    ///
    /// # Errors
    /// - `InvalidRole` when the participants are not a mentor and a student.
    /// - `Repo(MeetingValidation)` for an empty title, zero duration or an
    ///   out-of-range time.
    pub fn schedule(&self, meeting: &Meeting) -> MeetingServiceResult<MeetingId> {
        let mentor = self.require_role(meeting.mentor_id, Role::Mentor)?;
        let student = self.require_role(meeting.student_id, Role::Student)?;

        let id = self.meetings.create_meeting(meeting)?;
        info!(
            "event=meeting_schedule module=service status=ok meeting_id={} mentor_id={} student_id={} scheduled_at={}",
            id, mentor.id, student.id, meeting.scheduled_at
        );

        let title = format!("Meeting scheduled: {}", meeting.title);
        let when = meeting
            .scheduled_time()
            .map(|time| format!("Scheduled for {}", time.format("%Y-%m-%d %H:%M UTC")))
            .unwrap_or_else(|| "Scheduled".to_string());
        for recipient in [mentor.id, student.id] {
            if let Err(err) = self.notifier.notify_related(
                recipient,
                &title,
                &when,
                RelatedType::Meeting,
                Some(id),
            ) {
                warn!(
                    "event=meeting_notify module=service status=error meeting_id={} recipient_id={} error={}",
                    id, recipient, err
                );
            }
        }

        Ok(id)
    }

    pub fn get(&self, id: MeetingId) -> MeetingServiceResult<Meeting> {
        self.meetings
            .get_meeting(id)?
            .ok_or(MeetingServiceError::NotFound(id))
    }

    /// Every meeting of `person_id`, earliest first.
    pub fn list_for_person(&self, person_id: PersonId) -> MeetingServiceResult<Vec<Meeting>> {
        self.require_person(person_id)?;
        Ok(self.meetings.list_for_person(person_id)?)
    }

    /// Scheduled meetings of `person_id` that have not started yet.
    pub fn upcoming(&self, person_id: PersonId) -> MeetingServiceResult<Vec<Meeting>> {
        self.upcoming_at(person_id, Utc::now().timestamp_millis())
    }

    /// `upcoming` relative to `now_ms`.
    pub fn upcoming_at(&self, person_id: PersonId, now_ms: i64) -> MeetingServiceResult<Vec<Meeting>> {
        self.require_person(person_id)?;
        Ok(self.meetings.list_upcoming(person_id, now_ms)?)
    }

    pub fn update_status(&self, id: MeetingId, status: MeetingStatus) -> MeetingServiceResult<()> {
        self.meetings.update_status(id, status)?;
        info!(
            "event=meeting_status module=service status=ok meeting_id={} meeting_status={}",
            id, status
        );
        Ok(())
    }

    /// Progress report of `student_id`, or of the viewer when `None`.
    pub fn progress_report(
        &self,
        viewer_id: PersonId,
        student_id: Option<PersonId>,
    ) -> MeetingServiceResult<ProgressReport> {
        self.progress_report_at(viewer_id, student_id, Utc::now().timestamp_millis())
    }

    /// `progress_report` counting upcoming meetings from `now_ms`.
    ///
    /// # Errors
    /// - `Forbidden` when a non-mentor asks for someone else's report.
    /// - `InvalidRole` when the target is not a student.
    pub fn progress_report_at(
        &self,
        viewer_id: PersonId,
        student_id: Option<PersonId>,
        now_ms: i64,
    ) -> MeetingServiceResult<ProgressReport> {
        let viewer = self.require_person(viewer_id)?;
        let target = student_id.unwrap_or(viewer_id);
        if target != viewer_id && viewer.role != Role::Mentor {
            warn!(
                "event=meeting_progress module=service status=rejected reason=forbidden viewer_id={} student_id={}",
                viewer_id, target
            );
            return Err(MeetingServiceError::Forbidden { viewer_id });
        }
        self.require_role(target, Role::Student)?;

        let completed = self
            .meetings
            .list_for_student(target, MeetingStatus::Completed)?;
        let upcoming = self
            .meetings
            .count_for_student(target, MeetingStatus::Scheduled, Some(now_ms))?;
        let cancelled = self
            .meetings
            .count_for_student(target, MeetingStatus::Cancelled, None)?;

        Ok(ProgressReport::from_completed(
            target, completed, upcoming, cancelled,
        ))
    }

    fn require_person(&self, id: PersonId) -> MeetingServiceResult<Person> {
        self.persons
            .get_person(id)?
            .ok_or(MeetingServiceError::NotFound(id))
    }

    fn require_role(&self, id: PersonId, expected: Role) -> MeetingServiceResult<Person> {
        let person = self.require_person(id)?;
        if person.role != expected {
            return Err(MeetingServiceError::InvalidRole {
                person_id: id,
                expected,
                actual: person.role,
            });
        }
        Ok(person)
    }
}
