//! Persists mentor links on both sides of the relation.
//!
//! # Responsibility
//! - Write the student's mentor link and the mentor's student set.
//! - Keep both sides in agreement without a cross-record transaction.
//!
//! # Invariants
//! - Role checks happen before any write.
//! - The student side is written first with a conditional update, so a
//!   student can never end up with two mentors, even under concurrent
//!   registration retries.
//! - When the mentor-side write fails, the student side is reverted with the
//!   inverse conditional update and the failure is returned. Nothing is
//!   retried.

use crate::model::person::{Person, PersonId, Role};
use crate::repo::person_repo::{PersonRepository, RepoError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Assignment failure taxonomy.
#[derive(Debug)]
pub enum AssignError {
    /// A record with the wrong role was passed in.
    InvalidRole {
        person_id: PersonId,
        expected: Role,
        actual: Role,
    },
    /// The student already holds a mentor link. Non-fatal.
    AlreadyAssigned(PersonId),
    /// The student's mentor link changed between read and write.
    LinkChanged(PersonId),
    NotFound(PersonId),
    /// An underlying write failed. The caller decides whether to retry.
    Persistence(RepoError),
}

impl AssignError {
    /// Whether the caller can treat this as a benign outcome.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyAssigned(_))
    }
}

impl Display for AssignError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRole {
                person_id,
                expected,
                actual,
            } => write!(f, "person {person_id} has role `{actual}`, expected `{expected}`"),
            Self::AlreadyAssigned(id) => write!(f, "student {id} already has a mentor"),
            Self::LinkChanged(id) => write!(f, "mentor link of student {id} changed concurrently"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::Persistence(err) => write!(f, "assignment write failed: {err}"),
        }
    }
}

impl Error for AssignError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AssignError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Persistence(other),
        }
    }
}

/// The only component that mutates mentor links.
pub struct AssignmentApplier<R: PersonRepository> {
    repo: R,
}

impl<R: PersonRepository> AssignmentApplier<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Links an unassigned `student` to `mentor`.
    ///
    /// # Errors
    /// - `InvalidRole` when either argument has the wrong role; nothing is written.
    /// - `AlreadyAssigned` when the student gained a mentor in the meantime.
    /// - `Persistence` / `NotFound` when a write fails; the student side is
    ///   reverted first.
    pub fn apply(&self, student: &Person, mentor: &Person) -> Result<(), AssignError> {
        ensure_role(student, Role::Student)?;
        ensure_role(mentor, Role::Mentor)?;

        if !self
            .repo
            .compare_and_set_mentor(student.id, None, Some(mentor.id))?
        {
            info!(
                "event=assign_apply module=assign status=skipped reason=already_assigned student_id={}",
                student.id
            );
            return Err(AssignError::AlreadyAssigned(student.id));
        }

        if let Err(err) = self.repo.add_student_to_mentor(mentor.id, student.id) {
            error!(
                "event=assign_apply module=assign status=error error_code=mentor_write_failed student_id={} mentor_id={} error={}",
                student.id, mentor.id, err
            );
            self.revert_link(student.id, Some(mentor.id), None);
            return Err(err.into());
        }

        info!(
            "event=assign_apply module=assign status=ok student_id={} mentor_id={}",
            student.id, mentor.id
        );
        Ok(())
    }

    /// Moves `student` from its current mentor (if any) to `new_mentor`.
    ///
    /// Reassigning to the current mentor only re-asserts set membership, after
    /// confirming the stored link still points at that mentor.
    pub fn reassign(&self, student: &Person, new_mentor: &Person) -> Result<(), AssignError> {
        ensure_role(student, Role::Student)?;
        ensure_role(new_mentor, Role::Mentor)?;

        let old_mentor_id = match student.mentor {
            None => return self.apply(student, new_mentor),
            Some(id) if id == new_mentor.id => {
                if !self.repo.compare_and_set_mentor(student.id, Some(id), Some(id))? {
                    warn!(
                        "event=assign_reassign module=assign status=skipped reason=link_changed student_id={}",
                        student.id
                    );
                    return Err(AssignError::LinkChanged(student.id));
                }
                self.repo.add_student_to_mentor(new_mentor.id, student.id)?;
                return Ok(());
            }
            Some(id) => id,
        };

        if !self
            .repo
            .compare_and_set_mentor(student.id, Some(old_mentor_id), Some(new_mentor.id))?
        {
            warn!(
                "event=assign_reassign module=assign status=skipped reason=link_changed student_id={}",
                student.id
            );
            return Err(AssignError::LinkChanged(student.id));
        }

        if let Err(err) = self.repo.add_student_to_mentor(new_mentor.id, student.id) {
            error!(
                "event=assign_reassign module=assign status=error error_code=mentor_write_failed student_id={} mentor_id={} error={}",
                student.id, new_mentor.id, err
            );
            self.revert_link(student.id, Some(new_mentor.id), Some(old_mentor_id));
            return Err(err.into());
        }

        if let Err(err) = self.repo.remove_student_from_mentor(old_mentor_id, student.id) {
            error!(
                "event=assign_reassign module=assign status=error error_code=mentor_write_failed student_id={} mentor_id={} error={}",
                student.id, old_mentor_id, err
            );
            self.revert_link(student.id, Some(new_mentor.id), Some(old_mentor_id));
            if let Err(undo_err) = self.repo.remove_student_from_mentor(new_mentor.id, student.id) {
                error!(
                    "event=assign_rollback module=assign status=error student_id={} mentor_id={} error={}",
                    student.id, new_mentor.id, undo_err
                );
            }
            return Err(err.into());
        }

        info!(
            "event=assign_reassign module=assign status=ok student_id={} from_mentor_id={} mentor_id={}",
            student.id, old_mentor_id, new_mentor.id
        );
        Ok(())
    }

    fn revert_link(&self, student_id: PersonId, from: Option<PersonId>, to: Option<PersonId>) {
        match self.repo.compare_and_set_mentor(student_id, from, to) {
            Ok(true) => info!(
                "event=assign_rollback module=assign status=ok student_id={}",
                student_id
            ),
            Ok(false) => warn!(
                "event=assign_rollback module=assign status=skipped reason=link_changed student_id={}",
                student_id
            ),
            Err(err) => error!(
                "event=assign_rollback module=assign status=error student_id={} error={}",
                student_id, err
            ),
        }
    }
}

fn ensure_role(person: &Person, expected: Role) -> Result<(), AssignError> {
    if person.role != expected {
        return Err(AssignError::InvalidRole {
            person_id: person.id,
            expected,
            actual: person.role,
        });
    }
    Ok(())
}
