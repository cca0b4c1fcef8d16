//! Batch planner that spreads all unassigned students across mentors.
//!
//! # Responsibility
//! - Partition students by `(branch, category)` and mentors by branch.
//! - Fill mentors in listing order, at most `ceil(group / mentors)` students
//!   per mentor from any one group.
//!
//! # Invariants
//! - Pure over the given snapshot; no I/O, no logging.
//! - Each input student appears in at most one pair.
//! - Groups whose branch has no mentor produce no pairs and are reported in
//!   `BulkPlan::skipped`.
//! - Existing mentor load is not considered; every run is capacity-blind.

use crate::model::category::{category, Category};
use crate::model::person::{Branch, Person, PersonId};
use std::collections::BTreeMap;

/// One planned mentor link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentPair {
    pub student_id: PersonId,
    pub mentor_id: PersonId,
    pub branch: Branch,
    pub category: Category,
}

/// A `(branch, category)` group left unassigned for lack of mentors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedGroup {
    pub branch: Branch,
    pub category: Category,
    pub student_ids: Vec<PersonId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkPlan {
    pub pairs: Vec<AssignmentPair>,
    pub skipped: Vec<SkippedGroup>,
}

impl BulkPlan {
    /// Number of students that stay unassigned because of skipped groups.
    pub fn skipped_students(&self) -> usize {
        self.skipped.iter().map(|group| group.student_ids.len()).sum()
    }
}

/// Plans links for every unassigned student.
///
/// Non-mentors in `mentors`, non-students in `unassigned` and students that
/// already carry a mentor link are ignored.
pub fn plan_bulk(mentors: &[Person], unassigned: &[Person]) -> BulkPlan {
    let mut mentors_by_branch: BTreeMap<Branch, Vec<&Person>> = BTreeMap::new();
    for mentor in mentors.iter().filter(|person| person.is_mentor()) {
        mentors_by_branch.entry(mentor.branch).or_default().push(mentor);
    }

    let mut groups: BTreeMap<(Branch, Category), Vec<&Person>> = BTreeMap::new();
    for student in unassigned.iter().filter(|person| person.mentor.is_none()) {
        if let Some(category) = category(student) {
            groups
                .entry((student.branch, category))
                .or_default()
                .push(student);
        }
    }

    let mut plan = BulkPlan::default();
    for ((branch, category), students) in groups {
        let eligible = match mentors_by_branch.get(&branch) {
            Some(eligible) if !eligible.is_empty() => eligible,
            _ => {
                plan.skipped.push(SkippedGroup {
                    branch,
                    category,
                    student_ids: students.iter().map(|student| student.id).collect(),
                });
                continue;
            }
        };

        let cap = per_mentor_cap(students.len(), eligible.len());
        for (position, student) in students.iter().enumerate() {
            let mentor = eligible[mentor_index(position, cap, eligible.len())];
            plan.pairs.push(AssignmentPair {
                student_id: student.id,
                mentor_id: mentor.id,
                branch,
                category,
            });
        }
    }

    plan
}

/// `ceil(group_size / mentor_count)`; `mentor_count` must be non-zero.
pub fn per_mentor_cap(group_size: usize, mentor_count: usize) -> usize {
    group_size.div_ceil(mentor_count.max(1))
}

/// Positional fill: the i-th student goes to mentor `min(i / cap, n - 1)`.
pub fn mentor_index(position: usize, cap: usize, mentor_count: usize) -> usize {
    (position / cap.max(1)).min(mentor_count.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::person::{StudentProfile, TermScores};
    use std::collections::HashMap;

    fn mentor(tag: &str, branch: Branch) -> Person {
        Person::new_mentor(tag, format!("{tag}@example.com"), tag, branch)
    }

    fn student(tag: &str, branch: Branch, score: f64) -> Person {
        Person::new_student(
            tag,
            format!("{tag}@example.com"),
            tag,
            branch,
            StudentProfile::new(1, "A").with_scores(1, TermScores::both(score, score)),
        )
    }

    fn counts(plan: &BulkPlan) -> HashMap<PersonId, usize> {
        let mut counts = HashMap::new();
        for pair in &plan.pairs {
            *counts.entry(pair.mentor_id).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn cap_and_index_follow_positional_fill() {
        assert_eq!(per_mentor_cap(10, 3), 4);
        assert_eq!(per_mentor_cap(9, 3), 3);
        assert_eq!(per_mentor_cap(1, 5), 1);
        let indexes: Vec<usize> = (0..10).map(|i| mentor_index(i, 4, 3)).collect();
        assert_eq!(indexes, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn ten_students_three_mentors_fill_four_four_two() {
        let mentors = vec![
            mentor("m0", Branch::Computer),
            mentor("m1", Branch::Computer),
            mentor("m2", Branch::Computer),
        ];
        let students: Vec<Person> = (0..10)
            .map(|i| student(&format!("s{i}"), Branch::Computer, 7.0))
            .collect();

        let plan = plan_bulk(&mentors, &students);

        assert_eq!(plan.pairs.len(), 10);
        assert!(plan.skipped.is_empty());
        let counts = counts(&plan);
        assert_eq!(counts[&mentors[0].id], 4);
        assert_eq!(counts[&mentors[1].id], 4);
        assert_eq!(counts[&mentors[2].id], 2);
        // First students fill the first mentor before the second is used.
        for pair in &plan.pairs[..4] {
            assert_eq!(pair.mentor_id, mentors[0].id);
        }
        assert_eq!(plan.pairs[9].mentor_id, mentors[2].id);
    }

    #[test]
    fn branch_without_mentors_is_skipped_and_others_unaffected() {
        let mentors = vec![mentor("m0", Branch::It)];
        let students = vec![
            student("s0", Branch::It, 9.0),
            student("s1", Branch::Civil, 9.0),
            student("s2", Branch::Civil, 4.0),
        ];

        let plan = plan_bulk(&mentors, &students);

        assert_eq!(plan.pairs.len(), 1);
        assert_eq!(plan.pairs[0].student_id, students[0].id);
        assert_eq!(plan.pairs[0].category, Category::Topper);
        assert_eq!(plan.skipped.len(), 2);
        assert_eq!(plan.skipped_students(), 2);
        assert!(plan
            .skipped
            .iter()
            .all(|group| group.branch == Branch::Civil));
    }

    #[test]
    fn each_category_is_capped_independently() {
        let mentors = vec![mentor("m0", Branch::Extc), mentor("m1", Branch::Extc)];
        let students = vec![
            student("t0", Branch::Extc, 9.0),
            student("l0", Branch::Extc, 3.0),
            student("t1", Branch::Extc, 9.5),
            student("l1", Branch::Extc, 2.0),
            student("l2", Branch::Extc, 5.0),
        ];

        let plan = plan_bulk(&mentors, &students);
        let by_student: HashMap<PersonId, &AssignmentPair> =
            plan.pairs.iter().map(|pair| (pair.student_id, pair)).collect();

        // toppers: cap 1 -> one per mentor
        assert_eq!(by_student[&students[0].id].mentor_id, mentors[0].id);
        assert_eq!(by_student[&students[2].id].mentor_id, mentors[1].id);
        // low-range: cap 2 -> [m0, m0, m1]
        assert_eq!(by_student[&students[1].id].mentor_id, mentors[0].id);
        assert_eq!(by_student[&students[3].id].mentor_id, mentors[0].id);
        assert_eq!(by_student[&students[4].id].mentor_id, mentors[1].id);
    }

    #[test]
    fn mentors_from_other_branches_are_never_used() {
        let mentors = vec![mentor("m0", Branch::Civil), mentor("m1", Branch::Mechanical)];
        let students: Vec<Person> = (0..3)
            .map(|i| student(&format!("s{i}"), Branch::Mechanical, 6.5))
            .collect();

        let plan = plan_bulk(&mentors, &students);

        assert!(plan.pairs.iter().all(|pair| pair.mentor_id == mentors[1].id));
    }

    #[test]
    fn assigned_students_and_wrong_roles_are_ignored() {
        let mentors = vec![
            mentor("m0", Branch::Chemical),
            student("not-a-mentor", Branch::Chemical, 9.0),
        ];
        let mut assigned = student("s0", Branch::Chemical, 8.0);
        assigned.mentor = Some(mentors[0].id);
        let students = vec![assigned, student("s1", Branch::Chemical, 8.0), mentors[0].clone()];

        let plan = plan_bulk(&mentors, &students);

        assert_eq!(plan.pairs.len(), 1);
        assert_eq!(plan.pairs[0].student_id, students[1].id);
        assert_eq!(plan.pairs[0].mentor_id, mentors[0].id);
    }

    #[test]
    fn empty_inputs_produce_empty_plan() {
        assert_eq!(plan_bulk(&[], &[]), BulkPlan::default());
    }
}
