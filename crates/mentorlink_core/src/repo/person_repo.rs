//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the record-store operations the assignment engine consumes:
//!   fetch by role/branch, fetch by id, conditional mentor-link update and
//!   set-membership upsert.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Person::validate()` before SQL mutations.
//! - Mentor links are never written by `create_person`; they change only
//!   through `compare_and_set_mentor` and the membership operations.
//! - `compare_and_set_mentor` is a single conditional `UPDATE`, so two
//!   connections can never both observe success for the same expectation.
//! - Listing order is insertion order, which planners use as tie-break order.
//! - Writes open `IMMEDIATE` transactions so competing connections queue on
//!   the busy timeout instead of failing a lock upgrade.

use crate::db::DbError;
use crate::model::meeting::MeetingValidationError;
use crate::model::message::MessageValidationError;
use crate::model::notification::NotificationValidationError;
use crate::model::person::{
    validate_profile, Branch, Person, PersonId, PersonValidationError, Role, StudentProfile,
    TermScores,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PERSON_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    username,
    role,
    branch,
    current_year,
    division,
    mentor_id
FROM persons";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for record-store operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(PersonValidationError),
    NotificationValidation(NotificationValidationError),
    MessageValidation(MessageValidationError),
    MeetingValidation(MeetingValidationError),
    Db(DbError),
    NotFound(Uuid),
    /// Caller tried to create a record that already carries mentor links.
    LinkedOnCreate(PersonId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotificationValidation(err) => write!(f, "{err}"),
            Self::MessageValidation(err) => write!(f, "{err}"),
            Self::MeetingValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::LinkedOnCreate(id) => {
                write!(f, "record {id} cannot be created with mentor links already set")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotificationValidation(err) => Some(err),
            Self::MessageValidation(err) => Some(err),
            Self::MeetingValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::LinkedOnCreate(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<PersonValidationError> for RepoError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NotificationValidationError> for RepoError {
    fn from(value: NotificationValidationError) -> Self {
        Self::NotificationValidation(value)
    }
}

impl From<MessageValidationError> for RepoError {
    fn from(value: MessageValidationError) -> Self {
        Self::MessageValidation(value)
    }
}

impl From<MeetingValidationError> for RepoError {
    fn from(value: MeetingValidationError) -> Self {
        Self::MeetingValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter options for listing persons. All filters combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonListQuery {
    pub role: Option<Role>,
    pub branch: Option<Branch>,
    /// Restrict to students whose mentor link is absent.
    pub unassigned_only: bool,
    /// Restrict to students linked to this mentor.
    pub mentor_id: Option<PersonId>,
}

impl PersonListQuery {
    pub fn mentors() -> Self {
        Self {
            role: Some(Role::Mentor),
            ..Self::default()
        }
    }

    pub fn mentors_in(branch: Branch) -> Self {
        Self {
            branch: Some(branch),
            ..Self::mentors()
        }
    }

    pub fn unassigned_students() -> Self {
        Self {
            role: Some(Role::Student),
            unassigned_only: true,
            ..Self::default()
        }
    }

    pub fn students_of(mentor_id: PersonId) -> Self {
        Self {
            role: Some(Role::Student),
            mentor_id: Some(mentor_id),
            ..Self::default()
        }
    }
}

/// Record-store interface consumed by the assignment engine.
pub trait PersonRepository {
    fn create_person(&self, person: &Person) -> RepoResult<PersonId>;
    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn list_persons(&self, query: &PersonListQuery) -> RepoResult<Vec<Person>>;
    /// Sets the student's mentor link to `new` only if it currently equals
    /// `expected`. Returns `false` when the expectation did not hold.
    fn compare_and_set_mentor(
        &self,
        student_id: PersonId,
        expected: Option<PersonId>,
        new: Option<PersonId>,
    ) -> RepoResult<bool>;
    /// Adds `student_id` to the mentor's student set. Idempotent.
    fn add_student_to_mentor(&self, mentor_id: PersonId, student_id: PersonId) -> RepoResult<()>;
    /// Removes `student_id` from the mentor's student set. Idempotent.
    fn remove_student_from_mentor(
        &self,
        mentor_id: PersonId,
        student_id: PersonId,
    ) -> RepoResult<()>;
    /// Replaces the year, division and grade history of a student.
    fn update_student_profile(
        &self,
        student_id: PersonId,
        profile: &StudentProfile,
    ) -> RepoResult<()>;
}

impl<T: PersonRepository + ?Sized> PersonRepository for &T {
    fn create_person(&self, person: &Person) -> RepoResult<PersonId> {
        (**self).create_person(person)
    }

    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        (**self).get_person(id)
    }

    fn list_persons(&self, query: &PersonListQuery) -> RepoResult<Vec<Person>> {
        (**self).list_persons(query)
    }

    fn compare_and_set_mentor(
        &self,
        student_id: PersonId,
        expected: Option<PersonId>,
        new: Option<PersonId>,
    ) -> RepoResult<bool> {
        (**self).compare_and_set_mentor(student_id, expected, new)
    }

    fn add_student_to_mentor(&self, mentor_id: PersonId, student_id: PersonId) -> RepoResult<()> {
        (**self).add_student_to_mentor(mentor_id, student_id)
    }

    fn remove_student_from_mentor(
        &self,
        mentor_id: PersonId,
        student_id: PersonId,
    ) -> RepoResult<()> {
        (**self).remove_student_from_mentor(mentor_id, student_id)
    }

    fn update_student_profile(
        &self,
        student_id: PersonId,
        profile: &StudentProfile,
    ) -> RepoResult<()> {
        (**self).update_student_profile(student_id, profile)
    }
}

/// SQLite-backed person repository.
#[derive(Clone, Copy)]
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn write_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    fn hydrate(&self, mut person: Person) -> RepoResult<Person> {
        match person.role {
            Role::Student => {
                if let Some(profile) = person.student.as_mut() {
                    profile.scores = self.load_scores(person.id)?;
                }
            }
            Role::Mentor => {
                person.students = self.load_students(person.id)?;
            }
        }
        person.validate()?;
        Ok(person)
    }

    fn load_scores(&self, id: PersonId) -> RepoResult<BTreeMap<u8, TermScores>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, term1, term2
             FROM student_scores
             WHERE person_id = ?1
             ORDER BY year ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut scores = BTreeMap::new();

        while let Some(row) = rows.next()? {
            let year: i64 = row.get("year")?;
            let year = u8::try_from(year).map_err(|_| {
                RepoError::InvalidData(format!("invalid year `{year}` in student_scores.year"))
            })?;
            scores.insert(year, TermScores::new(row.get("term1")?, row.get("term2")?));
        }

        Ok(scores)
    }

    fn load_students(&self, mentor_id: PersonId) -> RepoResult<Vec<PersonId>> {
        let mut stmt = self.conn.prepare(
            "SELECT student_id
             FROM mentor_students
             WHERE mentor_id = ?1
             ORDER BY linked_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([mentor_id.to_string()])?;
        let mut students = Vec::new();

        while let Some(row) = rows.next()? {
            let text: String = row.get("student_id")?;
            students.push(parse_uuid(&text, "mentor_students.student_id")?);
        }

        Ok(students)
    }

    fn write_scores(&self, student_id: PersonId, profile: &StudentProfile) -> RepoResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO student_scores (person_id, year, term1, term2)
             VALUES (?1, ?2, ?3, ?4);",
        )?;
        for (year, scores) in &profile.scores {
            stmt.execute(params![
                student_id.to_string(),
                i64::from(*year),
                scores.term1,
                scores.term2,
            ])?;
        }
        Ok(())
    }

    fn exists_with_role(&self, id: PersonId, role: Role) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM persons WHERE id = ?1 AND role = ?2);",
            params![id.to_string(), role.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn create_person(&self, person: &Person) -> RepoResult<PersonId> {
        person.validate()?;
        if person.mentor.is_some() || !person.students.is_empty() {
            return Err(RepoError::LinkedOnCreate(person.id));
        }

        let tx = self.write_tx()?;
        tx.execute(
            "INSERT INTO persons (
                id,
                name,
                email,
                username,
                role,
                branch,
                current_year,
                division
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                person.id.to_string(),
                person.name.as_str(),
                person.email.as_str(),
                person.username.as_str(),
                person.role.as_str(),
                person.branch.as_str(),
                person.student.as_ref().and_then(|p| p.current_year).map(i64::from),
                person.student.as_ref().map(|p| p.division.as_str()),
            ],
        )?;
        if let Some(profile) = person.student.as_ref() {
            self.write_scores(person.id, profile)?;
        }
        tx.commit()?;

        Ok(person.id)
    }

    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let person = self
            .conn
            .query_row(
                &format!("{PERSON_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_person_row(row)),
            )
            .optional()?;

        match person {
            Some(parsed) => Ok(Some(self.hydrate(parsed?)?)),
            None => Ok(None),
        }
    }

    fn list_persons(&self, query: &PersonListQuery) -> RepoResult<Vec<Person>> {
        let mut sql = format!("{PERSON_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(role) = query.role {
            sql.push_str(" AND role = ?");
            bind_values.push(Value::Text(role.as_str().to_string()));
        }

        if let Some(branch) = query.branch {
            sql.push_str(" AND branch = ?");
            bind_values.push(Value::Text(branch.as_str().to_string()));
        }

        if query.unassigned_only {
            sql.push_str(" AND role = 'student' AND mentor_id IS NULL");
        }

        if let Some(mentor_id) = query.mentor_id {
            sql.push_str(" AND mentor_id = ?");
            bind_values.push(Value::Text(mentor_id.to_string()));
        }

        sql.push_str(" ORDER BY created_at ASC, rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut parsed = Vec::new();

        while let Some(row) = rows.next()? {
            parsed.push(parse_person_row(row)?);
        }

        parsed
            .into_iter()
            .map(|person| self.hydrate(person))
            .collect()
    }

    fn compare_and_set_mentor(
        &self,
        student_id: PersonId,
        expected: Option<PersonId>,
        new: Option<PersonId>,
    ) -> RepoResult<bool> {
        let tx = self.write_tx()?;
        let changed = tx.execute(
            "UPDATE persons
             SET mentor_id = ?1
             WHERE id = ?2
               AND role = 'student'
               AND mentor_id IS ?3;",
            params![
                new.map(|id| id.to_string()),
                student_id.to_string(),
                expected.map(|id| id.to_string()),
            ],
        )?;

        if changed == 0 && !self.exists_with_role(student_id, Role::Student)? {
            return Err(RepoError::NotFound(student_id));
        }
        tx.commit()?;
        Ok(changed == 1)
    }

    fn add_student_to_mentor(&self, mentor_id: PersonId, student_id: PersonId) -> RepoResult<()> {
        let tx = self.write_tx()?;
        let changed = tx.execute(
            "INSERT OR IGNORE INTO mentor_students (mentor_id, student_id)
             SELECT ?1, ?2
             WHERE EXISTS (SELECT 1 FROM persons WHERE id = ?1 AND role = 'mentor');",
            params![mentor_id.to_string(), student_id.to_string()],
        )?;

        if changed == 0 && !self.exists_with_role(mentor_id, Role::Mentor)? {
            return Err(RepoError::NotFound(mentor_id));
        }
        tx.commit()?;
        Ok(())
    }

    fn remove_student_from_mentor(
        &self,
        mentor_id: PersonId,
        student_id: PersonId,
    ) -> RepoResult<()> {
        let tx = self.write_tx()?;
        tx.execute(
            "DELETE FROM mentor_students WHERE mentor_id = ?1 AND student_id = ?2;",
            params![mentor_id.to_string(), student_id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_student_profile(
        &self,
        student_id: PersonId,
        profile: &StudentProfile,
    ) -> RepoResult<()> {
        validate_profile(profile)?;

        let tx = self.write_tx()?;
        let changed = tx.execute(
            "UPDATE persons
             SET current_year = ?1, division = ?2
             WHERE id = ?3 AND role = 'student';",
            params![
                profile.current_year.map(i64::from),
                profile.division.as_str(),
                student_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(student_id));
        }

        tx.execute(
            "DELETE FROM student_scores WHERE person_id = ?1;",
            [student_id.to_string()],
        )?;
        self.write_scores(student_id, profile)?;
        tx.commit()?;

        Ok(())
    }
}

/// Parses the `persons` columns. Scores and student sets are loaded separately.
fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "persons.id")?;

    let role_text: String = row.get("role")?;
    let role = Role::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in persons.role"))
    })?;

    let branch_text: String = row.get("branch")?;
    let branch = Branch::parse(&branch_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid branch `{branch_text}` in persons.branch"))
    })?;

    let mentor = match row.get::<_, Option<String>>("mentor_id")? {
        Some(text) => Some(parse_uuid(&text, "persons.mentor_id")?),
        None => None,
    };

    let student = match role {
        Role::Student => {
            let current_year = match row.get::<_, Option<i64>>("current_year")? {
                Some(year) => Some(u8::try_from(year).map_err(|_| {
                    RepoError::InvalidData(format!(
                        "invalid year `{year}` in persons.current_year"
                    ))
                })?),
                None => None,
            };
            Some(StudentProfile {
                current_year,
                scores: BTreeMap::new(),
                division: row.get::<_, Option<String>>("division")?.unwrap_or_default(),
            })
        }
        Role::Mentor => None,
    };

    Ok(Person {
        id,
        name: row.get("name")?,
        email: row.get("email")?,
        username: row.get("username")?,
        role,
        branch,
        student,
        mentor,
        students: Vec::new(),
    })
}

pub(crate) fn parse_uuid(text: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}
