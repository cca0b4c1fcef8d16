//! Meeting repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Participant listings are ordered by `scheduled_at ASC, rowid ASC`.
//! - Per-student status listings are latest first.
//! - The current time is always passed in; the store never reads a clock.

use crate::model::meeting::{Meeting, MeetingId, MeetingStatus};
use crate::model::person::PersonId;
use crate::repo::person_repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const MEETING_SELECT_SQL: &str = "SELECT
    id,
    mentor_id,
    student_id,
    title,
    description,
    scheduled_at,
    duration_minutes,
    meeting_link,
    status,
    created_at
FROM meetings";

pub trait MeetingRepository {
    fn create_meeting(&self, meeting: &Meeting) -> RepoResult<MeetingId>;
    fn get_meeting(&self, id: MeetingId) -> RepoResult<Option<Meeting>>;
    /// Meetings where `person_id` is mentor or student.
    fn list_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Meeting>>;
    /// Scheduled meetings of `person_id` starting at or after `now_ms`.
    fn list_upcoming(&self, person_id: PersonId, now_ms: i64) -> RepoResult<Vec<Meeting>>;
    fn update_status(&self, id: MeetingId, status: MeetingStatus) -> RepoResult<()>;
    /// A student's meetings in `status`, latest first.
    fn list_for_student(
        &self,
        student_id: PersonId,
        status: MeetingStatus,
    ) -> RepoResult<Vec<Meeting>>;
    /// Counts a student's meetings in `status`, optionally only from `from_ms` on.
    fn count_for_student(
        &self,
        student_id: PersonId,
        status: MeetingStatus,
        from_ms: Option<i64>,
    ) -> RepoResult<u64>;
}

impl<T: MeetingRepository + ?Sized> MeetingRepository for &T {
    fn create_meeting(&self, meeting: &Meeting) -> RepoResult<MeetingId> {
        (**self).create_meeting(meeting)
    }

    fn get_meeting(&self, id: MeetingId) -> RepoResult<Option<Meeting>> {
        (**self).get_meeting(id)
    }

    fn list_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Meeting>> {
        (**self).list_for_person(person_id)
    }

    fn list_upcoming(&self, person_id: PersonId, now_ms: i64) -> RepoResult<Vec<Meeting>> {
        (**self).list_upcoming(person_id, now_ms)
    }

    fn update_status(&self, id: MeetingId, status: MeetingStatus) -> RepoResult<()> {
        (**self).update_status(id, status)
    }

    fn list_for_student(
        &self,
        student_id: PersonId,
        status: MeetingStatus,
    ) -> RepoResult<Vec<Meeting>> {
        (**self).list_for_student(student_id, status)
    }

    fn count_for_student(
        &self,
        student_id: PersonId,
        status: MeetingStatus,
        from_ms: Option<i64>,
    ) -> RepoResult<u64> {
        (**self).count_for_student(student_id, status, from_ms)
    }
}

#[derive(Clone, Copy)]
pub struct SqliteMeetingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMeetingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_meetings(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<Meeting>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut meetings = Vec::new();

        while let Some(row) = rows.next()? {
            meetings.push(parse_meeting_row(row)?);
        }

        Ok(meetings)
    }
}

impl MeetingRepository for SqliteMeetingRepository<'_> {
    fn create_meeting(&self, meeting: &Meeting) -> RepoResult<MeetingId> {
        meeting.validate()?;

        self.conn.execute(
            "INSERT INTO meetings (
                id,
                mentor_id,
                student_id,
                title,
                description,
                scheduled_at,
                duration_minutes,
                meeting_link,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                meeting.id.to_string(),
                meeting.mentor_id.to_string(),
                meeting.student_id.to_string(),
                meeting.title.as_str(),
                meeting.description.as_str(),
                meeting.scheduled_at,
                i64::from(meeting.duration_minutes),
                meeting.meeting_link.as_deref(),
                meeting.status.as_str(),
            ],
        )?;

        Ok(meeting.id)
    }

    fn get_meeting(&self, id: MeetingId) -> RepoResult<Option<Meeting>> {
        let meeting = self
            .conn
            .query_row(
                &format!("{MEETING_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_meeting_row(row)),
            )
            .optional()?;

        meeting.transpose()
    }

    fn list_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Meeting>> {
        self.query_meetings(
            &format!(
                "{MEETING_SELECT_SQL}
                 WHERE mentor_id = ?1 OR student_id = ?1
                 ORDER BY scheduled_at ASC, rowid ASC;"
            ),
            [person_id.to_string()],
        )
    }

    fn list_upcoming(&self, person_id: PersonId, now_ms: i64) -> RepoResult<Vec<Meeting>> {
        self.query_meetings(
            &format!(
                "{MEETING_SELECT_SQL}
                 WHERE (mentor_id = ?1 OR student_id = ?1)
                   AND status = 'scheduled'
                   AND scheduled_at >= ?2
                 ORDER BY scheduled_at ASC, rowid ASC;"
            ),
            params![person_id.to_string(), now_ms],
        )
    }

    fn update_status(&self, id: MeetingId, status: MeetingStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE meetings SET status = ?1 WHERE id = ?2;",
            params![status.as_str(), id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn list_for_student(
        &self,
        student_id: PersonId,
        status: MeetingStatus,
    ) -> RepoResult<Vec<Meeting>> {
        self.query_meetings(
            &format!(
                "{MEETING_SELECT_SQL}
                 WHERE student_id = ?1 AND status = ?2
                 ORDER BY scheduled_at DESC, rowid DESC;"
            ),
            params![student_id.to_string(), status.as_str()],
        )
    }

    fn count_for_student(
        &self,
        student_id: PersonId,
        status: MeetingStatus,
        from_ms: Option<i64>,
    ) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM meetings
             WHERE student_id = ?1
               AND status = ?2
               AND (?3 IS NULL OR scheduled_at >= ?3);",
            params![student_id.to_string(), status.as_str(), from_ms],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative meeting count `{count}`")))
    }
}

fn parse_meeting_row(row: &Row<'_>) -> RepoResult<Meeting> {
    let status_text: String = row.get("status")?;
    let status = MeetingStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in meetings.status"))
    })?;

    let duration: i64 = row.get("duration_minutes")?;
    let duration_minutes = u32::try_from(duration).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid duration `{duration}` in meetings.duration_minutes"
        ))
    })?;

    Ok(Meeting {
        id: parse_uuid(&row.get::<_, String>("id")?, "meetings.id")?,
        mentor_id: parse_uuid(&row.get::<_, String>("mentor_id")?, "meetings.mentor_id")?,
        student_id: parse_uuid(&row.get::<_, String>("student_id")?, "meetings.student_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        scheduled_at: row.get("scheduled_at")?,
        duration_minutes,
        meeting_link: row.get("meeting_link")?,
        status,
        created_at: row.get("created_at")?,
    })
}
