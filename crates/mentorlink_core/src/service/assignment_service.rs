//! Assignment use-case service.
//!
//! # Responsibility
//! - Wire registration and the batch job to planners and the applier.
//! - Announce successful assignments through the injected `Notifier`.
//!
//! # Invariants
//! - Registration succeeds even when assignment fails or finds no mentor.
//! - Each bulk pair is applied independently; one failure never stops the run.
//! - Notification failures are logged and otherwise ignored.

use crate::assign::applier::{AssignError, AssignmentApplier};
use crate::assign::bulk::{plan_bulk, AssignmentPair, BulkPlan, SkippedGroup};
use crate::assign::incremental::{plan_one, PlanOutcome};
use crate::model::person::{Person, PersonId, Role, StudentProfile};
use crate::repo::person_repo::{PersonListQuery, PersonRepository, RepoResult};
use crate::service::notification_service::Notifier;
use log::{error, info, warn};
use std::collections::HashMap;
use std::time::Instant;

/// Non-failing outcomes of assigning one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentStatus {
    Assigned { mentor_id: PersonId },
    AlreadyAssigned,
    NoEligibleMentor,
}

/// What happened when a person registered.
#[derive(Debug)]
pub struct RegistrationOutcome {
    pub person_id: PersonId,
    /// `None` for mentors; students always get an assignment attempt.
    pub assignment: Option<Result<AssignmentStatus, AssignError>>,
}

impl RegistrationOutcome {
    /// Mentor assigned during registration, if any.
    pub fn mentor_id(&self) -> Option<PersonId> {
        match self.assignment {
            Some(Ok(AssignmentStatus::Assigned { mentor_id })) => Some(mentor_id),
            _ => None,
        }
    }
}

/// Summary of one bulk assignment run.
#[derive(Debug, Default)]
pub struct BulkAssignmentReport {
    pub assigned: Vec<AssignmentPair>,
    /// Students that gained a mentor concurrently before their pair was applied.
    pub lost_races: Vec<PersonId>,
    pub skipped: Vec<SkippedGroup>,
    pub failures: Vec<(PersonId, AssignError)>,
}

impl BulkAssignmentReport {
    pub fn skipped_students(&self) -> usize {
        self.skipped.iter().map(|group| group.student_ids.len()).sum()
    }
}

pub struct AssignmentService<R: PersonRepository, N: Notifier> {
    repo: R,
    notifier: N,
    notify_on_assignment: bool,
}

impl<R: PersonRepository, N: Notifier> AssignmentService<R, N> {
    /// Creates a service that announces assignments through `notifier`.
    pub fn new(repo: R, notifier: N) -> Self {
        Self {
            repo,
            notifier,
            notify_on_assignment: true,
        }
    }

    /// Enables or disables assignment announcements.
    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notify_on_assignment = enabled;
        self
    }

    pub fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        self.repo.get_person(id)
    }

    /// Stores a new account and, for students, assigns a mentor.
    ///
    /// # Errors
    /// - Only the insert itself can fail; assignment problems are reported in
    ///   `RegistrationOutcome::assignment`.
    pub fn register_person(&self, person: &Person) -> RepoResult<RegistrationOutcome> {
        let person_id = self.repo.create_person(person)?;
        info!(
            "event=person_register module=service status=ok person_id={} role={}",
            person_id, person.role
        );

        if person.role != Role::Student {
            return Ok(RegistrationOutcome {
                person_id,
                assignment: None,
            });
        }

        let assignment = self.assign_new_student(person_id);
        if let Err(err) = &assignment {
            warn!(
                "event=person_register module=service status=degraded person_id={} error={}",
                person_id, err
            );
        }

        Ok(RegistrationOutcome {
            person_id,
            assignment: Some(assignment),
        })
    }

    /// Assigns one student to the least-loaded mentor of its branch.
    pub fn assign_new_student(&self, student_id: PersonId) -> Result<AssignmentStatus, AssignError> {
        let student = self
            .repo
            .get_person(student_id)?
            .ok_or(AssignError::NotFound(student_id))?;
        let pool = self
            .repo
            .list_persons(&PersonListQuery::mentors_in(student.branch))?;

        let mentor = match plan_one(&student, &pool) {
            PlanOutcome::Assign(mentor) => mentor,
            PlanOutcome::AlreadyAssigned => return Ok(AssignmentStatus::AlreadyAssigned),
            PlanOutcome::NoEligibleMentor => {
                info!(
                    "event=assign_one module=service status=skipped reason=no_eligible_mentor student_id={} branch={}",
                    student.id, student.branch
                );
                return Ok(AssignmentStatus::NoEligibleMentor);
            }
            PlanOutcome::NotStudent => {
                return Err(AssignError::InvalidRole {
                    person_id: student.id,
                    expected: Role::Student,
                    actual: student.role,
                })
            }
        };

        match AssignmentApplier::new(&self.repo).apply(&student, mentor) {
            Ok(()) => {
                self.announce(&student, mentor);
                Ok(AssignmentStatus::Assigned {
                    mentor_id: mentor.id,
                })
            }
            Err(AssignError::AlreadyAssigned(_)) => Ok(AssignmentStatus::AlreadyAssigned),
            Err(err) => Err(err),
        }
    }

    /// Runs the batch planner over every unassigned student and applies the
    /// resulting pairs one by one.
    ///
    /// # Errors
    /// - Only the initial snapshot reads can fail the run.
    pub fn run_bulk_assignment(&self) -> RepoResult<BulkAssignmentReport> {
        let started_at = Instant::now();
        let mentors = self.repo.list_persons(&PersonListQuery::mentors())?;
        let students = self
            .repo
            .list_persons(&PersonListQuery::unassigned_students())?;
        info!(
            "event=assign_bulk module=service status=start mentors={} unassigned={}",
            mentors.len(),
            students.len()
        );

        let plan = plan_bulk(&mentors, &students);
        let report = self.apply_bulk_plan(plan, mentors.iter().chain(students.iter()));

        info!(
            "event=assign_bulk module=service status=ok duration_ms={} assigned={} lost_races={} skipped={} failed={}",
            started_at.elapsed().as_millis(),
            report.assigned.len(),
            report.lost_races.len(),
            report.skipped_students(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Applies a bulk plan computed over `snapshot`.
    ///
    /// Every planned pair ends up in exactly one of `assigned`, `lost_races`
    /// or `failures`. A pair naming a person missing from `snapshot` is
    /// reported as `NotFound`.
    pub fn apply_bulk_plan<'a>(
        &self,
        plan: BulkPlan,
        snapshot: impl IntoIterator<Item = &'a Person>,
    ) -> BulkAssignmentReport {
        for group in &plan.skipped {
            warn!(
                "event=assign_bulk module=service status=skipped reason=no_eligible_mentor branch={} category={} students={}",
                group.branch,
                group.category,
                group.student_ids.len()
            );
        }

        let by_id: HashMap<PersonId, &Person> = snapshot
            .into_iter()
            .map(|person| (person.id, person))
            .collect();
        let applier = AssignmentApplier::new(&self.repo);
        let mut report = BulkAssignmentReport {
            skipped: plan.skipped,
            ..BulkAssignmentReport::default()
        };

        for pair in plan.pairs {
            let (student, mentor) = match (by_id.get(&pair.student_id), by_id.get(&pair.mentor_id))
            {
                (Some(student), Some(mentor)) => (*student, *mentor),
                (student, _) => {
                    let missing = if student.is_none() {
                        pair.student_id
                    } else {
                        pair.mentor_id
                    };
                    error!(
                        "event=assign_bulk module=service status=error error_code=snapshot_missing student_id={} mentor_id={} missing_id={}",
                        pair.student_id, pair.mentor_id, missing
                    );
                    report
                        .failures
                        .push((pair.student_id, AssignError::NotFound(missing)));
                    continue;
                }
            };

            match applier.apply(student, mentor) {
                Ok(()) => {
                    self.announce(student, mentor);
                    report.assigned.push(pair);
                }
                Err(AssignError::AlreadyAssigned(id)) => report.lost_races.push(id),
                Err(err) => {
                    error!(
                        "event=assign_bulk module=service status=error student_id={} mentor_id={} error={}",
                        pair.student_id, pair.mentor_id, err
                    );
                    report.failures.push((pair.student_id, err));
                }
            }
        }

        report
    }

    /// Explicitly moves a student to another mentor.
    pub fn reassign_student(
        &self,
        student_id: PersonId,
        mentor_id: PersonId,
    ) -> Result<(), AssignError> {
        let student = self
            .repo
            .get_person(student_id)?
            .ok_or(AssignError::NotFound(student_id))?;
        let mentor = self
            .repo
            .get_person(mentor_id)?
            .ok_or(AssignError::NotFound(mentor_id))?;

        let unchanged = student.mentor == Some(mentor.id);
        AssignmentApplier::new(&self.repo).reassign(&student, &mentor)?;
        if !unchanged {
            self.announce(&student, &mentor);
        }
        Ok(())
    }

    /// Students currently linked to `mentor_id`, in registration order.
    pub fn mentor_roster(&self, mentor_id: PersonId) -> RepoResult<Vec<Person>> {
        self.repo
            .list_persons(&PersonListQuery::students_of(mentor_id))
    }

    /// Replaces a student's year and grade history. Existing links are kept.
    pub fn update_student_profile(
        &self,
        student_id: PersonId,
        profile: &StudentProfile,
    ) -> RepoResult<()> {
        self.repo.update_student_profile(student_id, profile)
    }

    fn announce(&self, student: &Person, mentor: &Person) {
        if !self.notify_on_assignment {
            return;
        }

        let messages = [
            (
                student.id,
                "Mentor assigned",
                format!("{} is now your mentor", mentor.name),
            ),
            (
                mentor.id,
                "New mentee assigned",
                format!("{} has been assigned to you", student.name),
            ),
        ];
        for (recipient, title, message) in messages {
            if let Err(err) = self.notifier.notify(recipient, title, &message) {
                warn!(
                    "event=notify module=service status=error recipient_id={} error={}",
                    recipient, err
                );
            }
        }
    }
}
