use mentorlink_core::db::open_db_in_memory;
use mentorlink_core::{
    Branch, Meeting, MeetingRepository, MeetingService, MeetingServiceError, MeetingStatus,
    MeetingValidationError, MonthlyMeetings, NoopNotifier, NotificationKind,
    NotificationRepository, NotificationService, Person, PersonRepository, RelatedType, RepoError,
    Role, SqliteMeetingRepository, SqliteNotificationRepository, SqlitePersonRepository,
    StudentProfile,
};
use rusqlite::Connection;
use uuid::Uuid;

// 2025-01-15T10:00:00Z, 2025-02-03T09:30:00Z, 2025-03-01T00:00:00Z
const JAN: i64 = 1_736_935_200_000;
const FEB: i64 = 1_738_575_000_000;
const MAR: i64 = 1_740_787_200_000;
const HOUR: i64 = 3_600_000;

fn seed_mentor(conn: &Connection, tag: &str) -> Person {
    let mentor = Person::new_mentor(tag, format!("{tag}@example.com"), tag, Branch::Mechanical);
    SqlitePersonRepository::new(conn)
        .create_person(&mentor)
        .unwrap();
    mentor
}

fn seed_student(conn: &Connection, tag: &str) -> Person {
    let student = Person::new_student(
        tag,
        format!("{tag}@example.com"),
        tag,
        Branch::Mechanical,
        StudentProfile::new(2, "B"),
    );
    SqlitePersonRepository::new(conn)
        .create_person(&student)
        .unwrap();
    student
}

fn meeting_service(
    conn: &Connection,
) -> MeetingService<SqlitePersonRepository<'_>, SqliteMeetingRepository<'_>, NoopNotifier> {
    MeetingService::new(
        SqlitePersonRepository::new(conn),
        SqliteMeetingRepository::new(conn),
        NoopNotifier,
    )
}

#[test]
fn schedule_stores_meeting_and_notifies_both_sides() {
    let conn = open_db_in_memory().unwrap();
    let m = seed_mentor(&conn, "mira");
    let s = seed_student(&conn, "sam");
    let notifications = SqliteNotificationRepository::new(&conn);
    let service = MeetingService::new(
        SqlitePersonRepository::new(&conn),
        SqliteMeetingRepository::new(&conn),
        NotificationService::new(notifications),
    );

    let meeting = Meeting::new(m.id, s.id, " Weekly sync ", JAN, 45)
        .with_description("progress check")
        .with_link("https://meet.example.com/abc");
    let id = service.schedule(&meeting).unwrap();

    let stored = service.get(id).unwrap();
    assert_eq!(stored.title, "Weekly sync");
    assert_eq!(stored.description, "progress check");
    assert_eq!(stored.meeting_link.as_deref(), Some("https://meet.example.com/abc"));
    assert_eq!(stored.duration_minutes, 45);
    assert_eq!(stored.status, MeetingStatus::Scheduled);
    assert!(stored.created_at.is_some());

    for person in [m.id, s.id] {
        let notes = notifications.list_for_recipient(person, 10).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Meeting scheduled: Weekly sync");
        assert_eq!(notes[0].message, "Scheduled for 2025-01-15 10:00 UTC");
        assert_eq!(notes[0].kind, NotificationKind::Success);
        assert_eq!(notes[0].related_type, Some(RelatedType::Meeting));
        assert_eq!(notes[0].related_id, Some(id));
    }
}

#[test]
fn schedule_requires_mentor_and_student_roles() {
    let conn = open_db_in_memory().unwrap();
    let m = seed_mentor(&conn, "mira");
    let other = seed_mentor(&conn, "otto");
    let s = seed_student(&conn, "sam");
    let service = meeting_service(&conn);

    let err = service
        .schedule(&Meeting::new(m.id, other.id, "peer chat", JAN, 30))
        .unwrap_err();
    assert!(matches!(
        err,
        MeetingServiceError::InvalidRole {
            person_id,
            expected: Role::Student,
            actual: Role::Mentor,
        } if person_id == other.id
    ));

    let err = service
        .schedule(&Meeting::new(s.id, s.id, "solo", JAN, 30))
        .unwrap_err();
    assert!(matches!(
        err,
        MeetingServiceError::InvalidRole {
            expected: Role::Mentor,
            actual: Role::Student,
            ..
        }
    ));

    let ghost = Uuid::new_v4();
    let err = service
        .schedule(&Meeting::new(m.id, ghost, "nobody", JAN, 30))
        .unwrap_err();
    assert!(matches!(err, MeetingServiceError::NotFound(id) if id == ghost));
    assert!(service.list_for_person(m.id).unwrap().is_empty());
}

#[test]
fn schedule_rejects_invalid_meeting() {
    let conn = open_db_in_memory().unwrap();
    let m = seed_mentor(&conn, "mira");
    let s = seed_student(&conn, "sam");
    let service = meeting_service(&conn);

    let err = service
        .schedule(&Meeting::new(m.id, s.id, "sync", JAN, 0))
        .unwrap_err();

    assert!(matches!(
        err,
        MeetingServiceError::Repo(RepoError::MeetingValidation(
            MeetingValidationError::ZeroDuration
        ))
    ));
}

#[test]
fn listings_are_per_participant_and_time_ordered() {
    let conn = open_db_in_memory().unwrap();
    let m = seed_mentor(&conn, "mira");
    let s1 = seed_student(&conn, "sam");
    let s2 = seed_student(&conn, "sia");
    let service = meeting_service(&conn);

    let late = service
        .schedule(&Meeting::new(m.id, s1.id, "late", FEB, 30))
        .unwrap();
    let early = service
        .schedule(&Meeting::new(m.id, s1.id, "early", JAN, 30))
        .unwrap();
    let other = service
        .schedule(&Meeting::new(m.id, s2.id, "other", MAR, 30))
        .unwrap();

    let ids: Vec<Uuid> = service
        .list_for_person(s1.id)
        .unwrap()
        .iter()
        .map(|meeting| meeting.id)
        .collect();
    assert_eq!(ids, vec![early, late]);

    let ids: Vec<Uuid> = service
        .list_for_person(m.id)
        .unwrap()
        .iter()
        .map(|meeting| meeting.id)
        .collect();
    assert_eq!(ids, vec![early, late, other]);
}

#[test]
fn upcoming_skips_past_and_non_scheduled_meetings() {
    let conn = open_db_in_memory().unwrap();
    let m = seed_mentor(&conn, "mira");
    let s = seed_student(&conn, "sam");
    let service = meeting_service(&conn);

    service
        .schedule(&Meeting::new(m.id, s.id, "past", JAN, 30))
        .unwrap();
    let cancelled = service
        .schedule(&Meeting::new(m.id, s.id, "cancelled", FEB + HOUR, 30))
        .unwrap();
    let next = service
        .schedule(&Meeting::new(m.id, s.id, "next", FEB, 30))
        .unwrap();
    let later = service
        .schedule(&Meeting::new(m.id, s.id, "later", MAR, 30))
        .unwrap();
    service
        .update_status(cancelled, MeetingStatus::Cancelled)
        .unwrap();

    let upcoming: Vec<Uuid> = service
        .upcoming_at(s.id, FEB)
        .unwrap()
        .iter()
        .map(|meeting| meeting.id)
        .collect();

    assert_eq!(upcoming, vec![next, later]);
    assert_eq!(service.upcoming_at(m.id, MAR + 1).unwrap().len(), 0);
}

#[test]
fn update_status_of_unknown_meeting_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = meeting_service(&conn);

    let ghost = Uuid::new_v4();
    let err = service
        .update_status(ghost, MeetingStatus::Completed)
        .unwrap_err();

    assert!(matches!(err, MeetingServiceError::NotFound(id) if id == ghost));
}

#[test]
fn progress_report_summarizes_student_meetings() {
    let conn = open_db_in_memory().unwrap();
    let m = seed_mentor(&conn, "mira");
    let s = seed_student(&conn, "sam");
    let other = seed_student(&conn, "sia");
    let service = meeting_service(&conn);

    let done = [(JAN, 30), (JAN + HOUR, 60), (FEB, 45)];
    for (at, minutes) in done {
        let id = service
            .schedule(&Meeting::new(m.id, s.id, "sync", at, minutes))
            .unwrap();
        service.update_status(id, MeetingStatus::Completed).unwrap();
    }
    let dropped = service
        .schedule(&Meeting::new(m.id, s.id, "dropped", FEB + HOUR, 30))
        .unwrap();
    service
        .update_status(dropped, MeetingStatus::Cancelled)
        .unwrap();
    service
        .schedule(&Meeting::new(m.id, s.id, "next", MAR, 30))
        .unwrap();
    service
        .schedule(&Meeting::new(m.id, s.id, "missed", FEB + 2 * HOUR, 30))
        .unwrap();
    let foreign = service
        .schedule(&Meeting::new(m.id, other.id, "other", JAN, 90))
        .unwrap();
    service
        .update_status(foreign, MeetingStatus::Completed)
        .unwrap();

    let report = service.progress_report_at(s.id, None, FEB + 3 * HOUR).unwrap();

    assert_eq!(report.student_id, s.id);
    assert_eq!(report.total_completed, 3);
    assert_eq!(report.total_duration_minutes, 135);
    assert_eq!(report.total_hours(), 2);
    assert_eq!(report.remaining_minutes(), 15);
    assert_eq!(report.average_duration_minutes(), 45);
    assert_eq!(report.upcoming_scheduled, 1);
    assert_eq!(report.cancelled, 1);
    assert_eq!(report.recent.len(), 3);
    assert_eq!(report.recent[0].scheduled_at, FEB);
    assert_eq!(
        report.by_month["2025-01"],
        MonthlyMeetings {
            meetings: 2,
            duration_minutes: 90
        }
    );
    assert_eq!(report.by_month["2025-02"].duration_minutes, 45);
}

#[test]
fn mentor_can_view_student_report_but_students_cannot_view_each_other() {
    let conn = open_db_in_memory().unwrap();
    let m = seed_mentor(&conn, "mira");
    let s = seed_student(&conn, "sam");
    let other = seed_student(&conn, "sia");
    let service = meeting_service(&conn);

    let report = service.progress_report_at(m.id, Some(s.id), JAN).unwrap();
    assert_eq!(report.student_id, s.id);
    assert_eq!(report.total_completed, 0);

    let err = service
        .progress_report_at(other.id, Some(s.id), JAN)
        .unwrap_err();
    assert!(matches!(err, MeetingServiceError::Forbidden { viewer_id } if viewer_id == other.id));

    // a mentor has no report of their own
    let err = service.progress_report_at(m.id, None, JAN).unwrap_err();
    assert!(matches!(
        err,
        MeetingServiceError::InvalidRole {
            expected: Role::Student,
            ..
        }
    ));
}

#[test]
fn count_for_student_honors_lower_bound() {
    let conn = open_db_in_memory().unwrap();
    let m = seed_mentor(&conn, "mira");
    let s = seed_student(&conn, "sam");
    let repo = SqliteMeetingRepository::new(&conn);

    for at in [JAN, FEB, MAR] {
        repo.create_meeting(&Meeting::new(m.id, s.id, "sync", at, 30))
            .unwrap();
    }

    assert_eq!(
        repo.count_for_student(s.id, MeetingStatus::Scheduled, None)
            .unwrap(),
        3
    );
    assert_eq!(
        repo.count_for_student(s.id, MeetingStatus::Scheduled, Some(FEB))
            .unwrap(),
        2
    );
    assert_eq!(
        repo.count_for_student(s.id, MeetingStatus::Completed, None)
            .unwrap(),
        0
    );
}
