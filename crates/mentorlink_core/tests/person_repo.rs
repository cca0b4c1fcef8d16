use mentorlink_core::db::open_db_in_memory;
use mentorlink_core::{
    Branch, Person, PersonListQuery, PersonRepository, PersonValidationError, RepoError, Role,
    SqlitePersonRepository, StudentProfile, TermScores,
};
use uuid::Uuid;

fn student(tag: &str, branch: Branch) -> Person {
    Person::new_student(
        tag,
        format!("{tag}@example.com"),
        tag,
        branch,
        StudentProfile::new(2, "A")
            .with_scores(1, TermScores::both(7.5, 8.0))
            .with_scores(2, TermScores::new(Some(9.0), None)),
    )
}

fn mentor(tag: &str, branch: Branch) -> Person {
    Person::new_mentor(tag, format!("{tag}@example.com"), tag, branch)
}

#[test]
fn create_and_get_roundtrip_preserves_profile() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::new(&conn);

    let person = student("asha", Branch::DataScience);
    let id = repo.create_person(&person).unwrap();

    let loaded = repo.get_person(id).unwrap().unwrap();
    assert_eq!(loaded, person);
    assert_eq!(loaded.branch, Branch::DataScience);
    let profile = loaded.student.unwrap();
    assert_eq!(profile.current_year, Some(2));
    assert_eq!(profile.scores[&2], TermScores::new(Some(9.0), None));
}

#[test]
fn get_missing_person_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::new(&conn);

    assert!(repo.get_person(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn create_rejects_invalid_and_prelinked_records() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::new(&conn);

    let mut invalid = student("bad", Branch::Civil);
    invalid.student.as_mut().unwrap().current_year = Some(5);
    let err = repo.create_person(&invalid).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(PersonValidationError::InvalidCurrentYear(Some(5)))
    ));

    let mut linked = student("linked", Branch::Civil);
    linked.mentor = Some(Uuid::new_v4());
    let err = repo.create_person(&linked).unwrap_err();
    assert!(matches!(err, RepoError::LinkedOnCreate(id) if id == linked.id));
}

#[test]
fn duplicate_email_is_a_db_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::new(&conn);

    repo.create_person(&student("dup", Branch::It)).unwrap();
    let mut other = student("other", Branch::It);
    other.email = "dup@example.com".to_string();

    assert!(matches!(
        repo.create_person(&other).unwrap_err(),
        RepoError::Db(_)
    ));
}

#[test]
fn list_filters_by_role_branch_and_link_state() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::new(&conn);

    let m_it = mentor("m-it", Branch::It);
    let m_civil = mentor("m-civil", Branch::Civil);
    let s1 = student("s1", Branch::It);
    let s2 = student("s2", Branch::It);
    for person in [&m_it, &s1, &m_civil, &s2] {
        repo.create_person(person).unwrap();
    }
    assert!(repo.compare_and_set_mentor(s1.id, None, Some(m_it.id)).unwrap());

    let mentors = repo.list_persons(&PersonListQuery::mentors()).unwrap();
    let ids: Vec<Uuid> = mentors.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![m_it.id, m_civil.id]);

    let it_mentors = repo
        .list_persons(&PersonListQuery::mentors_in(Branch::It))
        .unwrap();
    assert_eq!(it_mentors.len(), 1);
    assert_eq!(it_mentors[0].id, m_it.id);

    let unassigned = repo
        .list_persons(&PersonListQuery::unassigned_students())
        .unwrap();
    assert_eq!(unassigned.len(), 1);
    assert_eq!(unassigned[0].id, s2.id);

    let roster = repo
        .list_persons(&PersonListQuery::students_of(m_it.id))
        .unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].id, s1.id);

    let everyone = repo.list_persons(&PersonListQuery::default()).unwrap();
    assert_eq!(everyone.len(), 4);
    assert_eq!(
        everyone.iter().filter(|p| p.role == Role::Student).count(),
        2
    );
}

#[test]
fn compare_and_set_only_applies_when_expectation_holds() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::new(&conn);

    let m1 = mentor("m1", Branch::Computer);
    let m2 = mentor("m2", Branch::Computer);
    let s = student("s", Branch::Computer);
    for person in [&m1, &m2, &s] {
        repo.create_person(person).unwrap();
    }

    assert!(repo.compare_and_set_mentor(s.id, None, Some(m1.id)).unwrap());
    assert!(!repo.compare_and_set_mentor(s.id, None, Some(m2.id)).unwrap());
    assert_eq!(repo.get_person(s.id).unwrap().unwrap().mentor, Some(m1.id));

    assert!(repo
        .compare_and_set_mentor(s.id, Some(m1.id), Some(m2.id))
        .unwrap());
    assert!(repo.compare_and_set_mentor(s.id, Some(m2.id), None).unwrap());
    assert_eq!(repo.get_person(s.id).unwrap().unwrap().mentor, None);
}

#[test]
fn compare_and_set_on_missing_or_mentor_record_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::new(&conn);

    let m = mentor("m", Branch::Computer);
    repo.create_person(&m).unwrap();

    let missing = Uuid::new_v4();
    assert!(matches!(
        repo.compare_and_set_mentor(missing, None, Some(m.id)),
        Err(RepoError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        repo.compare_and_set_mentor(m.id, None, Some(m.id)),
        Err(RepoError::NotFound(id)) if id == m.id
    ));
}

#[test]
fn membership_is_a_set() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::new(&conn);

    let m = mentor("m", Branch::Mechanical);
    let s = student("s", Branch::Mechanical);
    repo.create_person(&m).unwrap();
    repo.create_person(&s).unwrap();

    repo.add_student_to_mentor(m.id, s.id).unwrap();
    repo.add_student_to_mentor(m.id, s.id).unwrap();
    assert_eq!(repo.get_person(m.id).unwrap().unwrap().students, vec![s.id]);

    repo.remove_student_from_mentor(m.id, s.id).unwrap();
    repo.remove_student_from_mentor(m.id, s.id).unwrap();
    assert!(repo.get_person(m.id).unwrap().unwrap().students.is_empty());
}

#[test]
fn membership_requires_a_mentor_record() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::new(&conn);

    let s = student("s", Branch::Mechanical);
    let other = student("other", Branch::Mechanical);
    repo.create_person(&s).unwrap();
    repo.create_person(&other).unwrap();

    assert!(matches!(
        repo.add_student_to_mentor(other.id, s.id),
        Err(RepoError::NotFound(id)) if id == other.id
    ));
}

#[test]
fn update_student_profile_replaces_scores() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::new(&conn);

    let s = student("s", Branch::Chemical);
    repo.create_person(&s).unwrap();

    let profile = StudentProfile::new(3, "C").with_scores(3, TermScores::both(6.0, 6.5));
    repo.update_student_profile(s.id, &profile).unwrap();

    let loaded = repo.get_person(s.id).unwrap().unwrap();
    assert_eq!(loaded.student, Some(profile));

    let invalid = StudentProfile::new(1, "C").with_scores(1, TermScores::both(-1.0, 5.0));
    assert!(matches!(
        repo.update_student_profile(s.id, &invalid),
        Err(RepoError::Validation(_))
    ));
    assert!(matches!(
        repo.update_student_profile(Uuid::new_v4(), &StudentProfile::new(1, "C")),
        Err(RepoError::NotFound(_))
    ));
}
