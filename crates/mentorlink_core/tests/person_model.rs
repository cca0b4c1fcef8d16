use mentorlink_core::{
    average_score, category, Branch, Category, Person, PersonValidationError, Role,
    StudentProfile, TermScores,
};
use uuid::Uuid;

#[test]
fn new_student_normalizes_contact_fields() {
    let person = Person::new_student(
        "  Asha Rao ",
        " Asha@Example.COM ",
        " asha ",
        Branch::Extc,
        StudentProfile::new(3, "B"),
    );

    assert!(!person.id.is_nil());
    assert_eq!(person.name, "Asha Rao");
    assert_eq!(person.email, "asha@example.com");
    assert_eq!(person.username, "asha");
    assert_eq!(person.role, Role::Student);
    assert_eq!(person.mentor, None);
    assert!(person.students.is_empty());
    assert!(person.validate().is_ok());
}

#[test]
fn person_serialization_uses_expected_wire_fields() {
    let mut person = Person::new_student(
        "Dev",
        "dev@example.com",
        "dev",
        Branch::DataScience,
        StudentProfile::new(2, "A").with_scores(1, TermScores::new(Some(8.0), None)),
    );
    person.id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();

    let json = serde_json::to_value(&person).unwrap();
    assert_eq!(json["id"], "11111111-2222-4333-8444-555555555555");
    assert_eq!(json["role"], "student");
    assert_eq!(json["branch"], "Data Science");
    assert_eq!(json["student"]["current_year"], 2);
    assert_eq!(json["student"]["scores"]["1"]["term1"], 8.0);
    assert!(json["student"]["scores"]["1"]["term2"].is_null());
    assert!(json["mentor"].is_null());

    let decoded: Person = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, person);
}

#[test]
fn branch_and_category_wire_names() {
    assert_eq!(serde_json::to_value(Branch::It).unwrap(), "IT");
    assert_eq!(serde_json::to_value(Branch::Extc).unwrap(), "EXTC");
    assert_eq!(serde_json::to_value(Branch::Computer).unwrap(), "Computer");
    assert_eq!(serde_json::to_value(Category::MidRange).unwrap(), "mid-range");
    assert_eq!(
        serde_json::from_value::<Category>(serde_json::json!("low-range")).unwrap(),
        Category::LowRange
    );
}

#[test]
fn validate_rejects_cross_role_fields() {
    let mut mentor = Person::new_mentor("M", "m@example.com", "m", Branch::Civil);
    mentor.mentor = Some(Uuid::new_v4());
    assert_eq!(
        mentor.validate().unwrap_err(),
        PersonValidationError::MentorLinkOnMentor
    );

    let mut student = Person::new_student(
        "S",
        "s@example.com",
        "s",
        Branch::Civil,
        StudentProfile::new(1, "A"),
    );
    student.students.push(Uuid::new_v4());
    assert_eq!(
        student.validate().unwrap_err(),
        PersonValidationError::StudentSetOnStudent
    );

    student.students.clear();
    student.email = "not-an-email".to_string();
    assert_eq!(
        student.validate().unwrap_err(),
        PersonValidationError::InvalidEmail("not-an-email".to_string())
    );
}

#[test]
fn category_follows_recorded_history() {
    let profile = StudentProfile::new(2, "A")
        .with_scores(1, TermScores::both(9.0, 8.0))
        .with_scores(2, TermScores::new(None, Some(9.0)));
    let student = Person::new_student("S", "s@example.com", "s", Branch::It, profile.clone());

    assert!((average_score(&profile) - 8.67).abs() < 1e-9);
    assert_eq!(category(&student), Some(Category::Topper));

    let mentor = Person::new_mentor("M", "m@example.com", "m", Branch::It);
    assert_eq!(category(&mentor), None);
}
