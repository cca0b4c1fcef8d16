//! Single-student planner used right after registration.
//!
//! Balances purely on raw load: the student's category is not consulted,
//! unlike the bulk planner.

use crate::model::person::Person;

/// Result of planning one student. Only `Assign` leads to a write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanOutcome<'a> {
    Assign(&'a Person),
    /// The student already has a mentor link; nothing to do.
    AlreadyAssigned,
    /// No mentor shares the student's branch.
    NoEligibleMentor,
    /// The subject is not a student.
    NotStudent,
}

impl<'a> PlanOutcome<'a> {
    /// The selected mentor, if any.
    pub fn mentor(&self) -> Option<&'a Person> {
        match self {
            Self::Assign(mentor) => Some(mentor),
            _ => None,
        }
    }
}

/// Picks the least-loaded mentor of the student's branch.
///
/// Ties resolve to the first mentor in `mentor_pool` order.
pub fn plan_one<'a>(student: &Person, mentor_pool: &'a [Person]) -> PlanOutcome<'a> {
    if !student.is_student() {
        return PlanOutcome::NotStudent;
    }
    if student.mentor.is_some() {
        return PlanOutcome::AlreadyAssigned;
    }

    mentor_pool
        .iter()
        .filter(|mentor| mentor.is_mentor() && mentor.branch == student.branch)
        .min_by_key(|mentor| mentor.student_count())
        .map_or(PlanOutcome::NoEligibleMentor, PlanOutcome::Assign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::person::{Branch, StudentProfile, TermScores};
    use uuid::Uuid;

    fn mentor_with_load(tag: &str, branch: Branch, load: usize) -> Person {
        let mut mentor = Person::new_mentor(tag, format!("{tag}@example.com"), tag, branch);
        mentor.students = (0..load).map(|_| Uuid::new_v4()).collect();
        mentor
    }

    fn student(branch: Branch) -> Person {
        Person::new_student(
            "Neha",
            "neha@example.com",
            "neha",
            branch,
            StudentProfile::new(2, "B").with_scores(1, TermScores::both(9.0, 9.2)),
        )
    }

    #[test]
    fn selects_least_loaded_mentor() {
        let pool = vec![
            mentor_with_load("m3", Branch::Computer, 3),
            mentor_with_load("m1", Branch::Computer, 1),
            mentor_with_load("m2", Branch::Computer, 2),
        ];

        let outcome = plan_one(&student(Branch::Computer), &pool);

        assert_eq!(outcome.mentor().map(|m| m.id), Some(pool[1].id));
    }

    #[test]
    fn ties_go_to_first_listed_mentor() {
        let pool = vec![
            mentor_with_load("a", Branch::It, 2),
            mentor_with_load("b", Branch::It, 1),
            mentor_with_load("c", Branch::It, 1),
        ];

        let outcome = plan_one(&student(Branch::It), &pool);

        assert_eq!(outcome.mentor().map(|m| m.id), Some(pool[1].id));
    }

    #[test]
    fn other_branches_are_not_eligible() {
        let pool = vec![
            mentor_with_load("civil", Branch::Civil, 0),
            mentor_with_load("it", Branch::It, 7),
        ];

        let outcome = plan_one(&student(Branch::It), &pool);
        assert_eq!(outcome.mentor().map(|m| m.id), Some(pool[1].id));

        let outcome = plan_one(&student(Branch::DataScience), &pool);
        assert_eq!(outcome, PlanOutcome::NoEligibleMentor);
    }

    #[test]
    fn assigned_student_is_a_no_op() {
        let pool = vec![mentor_with_load("m", Branch::Computer, 0)];
        let mut assigned = student(Branch::Computer);
        assigned.mentor = Some(Uuid::new_v4());

        assert_eq!(plan_one(&assigned, &pool), PlanOutcome::AlreadyAssigned);
    }

    #[test]
    fn mentors_cannot_be_planned() {
        let pool = vec![mentor_with_load("m", Branch::Computer, 0)];
        assert_eq!(plan_one(&pool[0], &pool), PlanOutcome::NotStudent);
    }
}
