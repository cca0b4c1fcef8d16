//! Person domain model.
//!
//! # Responsibility
//! - Define the single account record shared by students and mentors.
//! - Validate role-specific fields before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another person.
//! - A student holds at most one `mentor` link and never a `students` set.
//! - A mentor holds a `students` set and never a `mentor` link.
//! - Mentor links are identifiers into the record store, never owned records.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every account.
pub type PersonId = Uuid;

/// Highest academic year a student can be enrolled in.
pub const MAX_YEAR: u8 = 4;
/// Upper bound of the per-term grade scale.
pub const MAX_SCORE: f64 = 10.0;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Capability set of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Mentor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Mentor => "mentor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "mentor" => Some(Self::Mentor),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Academic department, the primary matching key between students and mentors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Branch {
    Computer,
    #[serde(rename = "IT")]
    It,
    #[serde(rename = "EXTC")]
    Extc,
    Chemical,
    Mechanical,
    #[serde(rename = "Data Science")]
    DataScience,
    Civil,
}

impl Branch {
    pub const ALL: [Branch; 7] = [
        Self::Computer,
        Self::It,
        Self::Extc,
        Self::Chemical,
        Self::Mechanical,
        Self::DataScience,
        Self::Civil,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Computer => "Computer",
            Self::It => "IT",
            Self::Extc => "EXTC",
            Self::Chemical => "Chemical",
            Self::Mechanical => "Mechanical",
            Self::DataScience => "Data Science",
            Self::Civil => "Civil",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|branch| branch.as_str() == value)
    }
}

impl Display for Branch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grades for the two terms of one academic year. Either term may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TermScores {
    pub term1: Option<f64>,
    pub term2: Option<f64>,
}

impl TermScores {
    pub fn new(term1: Option<f64>, term2: Option<f64>) -> Self {
        Self { term1, term2 }
    }

    /// Both terms graded.
    pub fn both(term1: f64, term2: f64) -> Self {
        Self::new(Some(term1), Some(term2))
    }

    /// Iterates the recorded (non-null) scores in term order.
    pub fn recorded(&self) -> impl Iterator<Item = f64> {
        self.term1.into_iter().chain(self.term2)
    }
}

/// Student-only profile fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Current academic year, 1 through 4.
    pub current_year: Option<u8>,
    /// Year (1-based) to term grades. Missing years are allowed.
    pub scores: BTreeMap<u8, TermScores>,
    pub division: String,
}

impl StudentProfile {
    pub fn new(current_year: u8, division: impl Into<String>) -> Self {
        Self {
            current_year: Some(current_year),
            scores: BTreeMap::new(),
            division: division.into(),
        }
    }

    /// Builder-style helper for recording one year of grades.
    pub fn with_scores(mut self, year: u8, scores: TermScores) -> Self {
        self.scores.insert(year, scores);
        self
    }
}

/// Account record for a student or a mentor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    /// Normalized to trimmed lowercase.
    pub email: String,
    pub username: String,
    pub role: Role,
    pub branch: Branch,
    /// Present iff `role == Role::Student`.
    pub student: Option<StudentProfile>,
    /// Students only: the assigned mentor, absent until assigned.
    pub mentor: Option<PersonId>,
    /// Mentors only: assigned students. Order carries no meaning.
    pub students: Vec<PersonId>,
}

impl Person {
    /// Creates an unassigned student with a generated ID.
    pub fn new_student(
        name: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
        branch: Branch,
        profile: StudentProfile,
    ) -> Self {
        Self::base(name, email, username, Role::Student, branch, Some(profile))
    }

    /// Creates a mentor with an empty student set and a generated ID.
    pub fn new_mentor(
        name: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
        branch: Branch,
    ) -> Self {
        Self::base(name, email, username, Role::Mentor, branch, None)
    }

    fn base(
        name: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
        role: Role,
        branch: Branch,
        student: Option<StudentProfile>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            email: email.into().trim().to_ascii_lowercase(),
            username: username.into().trim().to_string(),
            role,
            branch,
            student,
            mentor: None,
            students: Vec::new(),
        }
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn is_mentor(&self) -> bool {
        self.role == Role::Mentor
    }

    /// Current load of a mentor. Always zero for students.
    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    /// Validates identity and role-specific invariants.
    ///
    /// # Errors
    /// - Returns the first violated rule.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        if self.name.trim().is_empty() {
            return Err(PersonValidationError::EmptyName);
        }
        if self.username.trim().is_empty() {
            return Err(PersonValidationError::EmptyUsername);
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(PersonValidationError::InvalidEmail(self.email.clone()));
        }

        match self.role {
            Role::Mentor => {
                if self.student.is_some() {
                    return Err(PersonValidationError::ProfileOnMentor);
                }
                if self.mentor.is_some() {
                    return Err(PersonValidationError::MentorLinkOnMentor);
                }
                Ok(())
            }
            Role::Student => {
                if !self.students.is_empty() {
                    return Err(PersonValidationError::StudentSetOnStudent);
                }
                let profile = self
                    .student
                    .as_ref()
                    .ok_or(PersonValidationError::MissingStudentProfile)?;
                validate_profile(profile)
            }
        }
    }
}

/// Validates the student-only fields on their own.
pub fn validate_profile(profile: &StudentProfile) -> Result<(), PersonValidationError> {
    match profile.current_year {
        Some(year) if (1..=MAX_YEAR).contains(&year) => {}
        other => return Err(PersonValidationError::InvalidCurrentYear(other)),
    }

    for (year, scores) in &profile.scores {
        if !(1..=MAX_YEAR).contains(year) {
            return Err(PersonValidationError::InvalidScoreYear(*year));
        }
        for score in scores.recorded() {
            if !score.is_finite() || !(0.0..=MAX_SCORE).contains(&score) {
                return Err(PersonValidationError::ScoreOutOfRange { year: *year, score });
            }
        }
    }

    Ok(())
}

/// Validation errors for person records.
#[derive(Debug, Clone, PartialEq)]
pub enum PersonValidationError {
    EmptyName,
    EmptyUsername,
    InvalidEmail(String),
    MissingStudentProfile,
    ProfileOnMentor,
    MentorLinkOnMentor,
    StudentSetOnStudent,
    InvalidCurrentYear(Option<u8>),
    InvalidScoreYear(u8),
    ScoreOutOfRange { year: u8, score: f64 },
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name cannot be empty"),
            Self::EmptyUsername => write!(f, "username cannot be empty"),
            Self::InvalidEmail(email) => write!(f, "invalid email address `{email}`"),
            Self::MissingStudentProfile => write!(f, "student record requires a profile"),
            Self::ProfileOnMentor => write!(f, "mentor record cannot carry a student profile"),
            Self::MentorLinkOnMentor => write!(f, "mentor record cannot carry a mentor link"),
            Self::StudentSetOnStudent => write!(f, "student record cannot carry a student set"),
            Self::InvalidCurrentYear(Some(year)) => {
                write!(f, "current year {year} is outside 1..={MAX_YEAR}")
            }
            Self::InvalidCurrentYear(None) => write!(f, "student record requires a current year"),
            Self::InvalidScoreYear(year) => {
                write!(f, "score year {year} is outside 1..={MAX_YEAR}")
            }
            Self::ScoreOutOfRange { year, score } => {
                write!(f, "score {score} for year {year} is outside 0..={MAX_SCORE}")
            }
        }
    }
}

impl Error for PersonValidationError {}
