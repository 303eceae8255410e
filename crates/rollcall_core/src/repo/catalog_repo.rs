//! Catalog repository: accounts, courses, sections, school years, subjects,
//! student profiles and enrollments.
//!
//! # Invariants
//! - Student registration writes account, profile and enrollments in one
//!   transaction.
//! - Duplicate emails surface as `RepoError::Conflict`.
//! - The initial account is only created into an empty `users` table.

use crate::model::account::{Account, NewAccount, Role, UserId};
use crate::model::catalog::{
    Course, CourseId, NewStudent, SchoolYear, SchoolYearId, Section, SectionId, StudentProfile,
    StudentStatus, Subject, SubjectId, YearLevel,
};
use crate::repo::{
    bool_to_int, ensure_connection_ready, int_to_bool, map_unique_violation, RepoError,
    RepoResult,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;

const ACCOUNT_SELECT_SQL: &str = "SELECT
    id,
    email,
    first_name,
    middle_initial,
    last_name,
    role,
    is_active
FROM users";

const SUBJECT_SELECT_SQL: &str = "SELECT
    id,
    subject_name,
    staff_id,
    course_id,
    is_offered
FROM subjects";

/// Data access contract for the school catalog.
pub trait CatalogRepository {
    fn create_account(&self, account: &NewAccount) -> RepoResult<Account>;
    /// Creates `account` only while no account exists yet; `Conflict` otherwise.
    fn create_initial_account(&self, account: &NewAccount) -> RepoResult<Account>;
    fn get_account(&self, id: UserId) -> RepoResult<Option<Account>>;
    fn set_account_active(&self, id: UserId, is_active: bool) -> RepoResult<()>;

    fn create_course(&self, course_name: &str) -> RepoResult<Course>;
    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>>;

    fn create_section(&self, course_id: CourseId, section_name: &str) -> RepoResult<Section>;
    fn get_section(&self, id: SectionId) -> RepoResult<Option<Section>>;
    /// Sections of one course ordered by name.
    fn list_sections_for_course(&self, course_id: CourseId) -> RepoResult<Vec<Section>>;

    fn create_school_year(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<SchoolYear>;
    fn get_school_year(&self, id: SchoolYearId) -> RepoResult<Option<SchoolYear>>;
    /// School years ordered by end date, most recent first.
    fn list_school_years(&self) -> RepoResult<Vec<SchoolYear>>;

    fn create_subject(
        &self,
        subject_name: &str,
        staff_id: UserId,
        course_id: CourseId,
    ) -> RepoResult<Subject>;
    fn get_subject(&self, id: SubjectId) -> RepoResult<Option<Subject>>;
    /// Reassigns the owning staff member of a subject.
    fn set_subject_owner(&self, id: SubjectId, staff_id: UserId) -> RepoResult<()>;
    /// Offered subjects owned by `staff_id`, ordered by name.
    fn list_offered_subjects_for_staff(&self, staff_id: UserId) -> RepoResult<Vec<Subject>>;

    /// Creates a student account, profile and enrollments atomically.
    fn register_student(&self, student: &NewStudent) -> RepoResult<(Account, StudentProfile)>;
    fn get_student_profile(&self, user_id: UserId) -> RepoResult<Option<StudentProfile>>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_account(&self, account: &NewAccount) -> RepoResult<Account> {
        insert_account(self.conn, account)
    }

    fn create_initial_account(&self, account: &NewAccount) -> RepoResult<Account> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let has_accounts: bool =
            tx.query_row("SELECT EXISTS (SELECT 1 FROM users);", [], |row| row.get(0))?;
        if has_accounts {
            return Err(RepoError::Conflict(
                "accounts already exist; bootstrap is closed".to_string(),
            ));
        }
        let created = insert_account(&tx, account)?;
        tx.commit()?;
        Ok(created)
    }

    fn get_account(&self, id: UserId) -> RepoResult<Option<Account>> {
        self.conn
            .query_row(
                &format!("{ACCOUNT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_account_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn set_account_active(&self, id: UserId, is_active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET
                is_active = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, bool_to_int(is_active)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "account",
                id,
            });
        }
        Ok(())
    }

    fn create_course(&self, course_name: &str) -> RepoResult<Course> {
        self.conn.execute(
            "INSERT INTO courses (course_name) VALUES (?1);",
            [course_name],
        )?;
        Ok(Course {
            id: self.conn.last_insert_rowid(),
            course_name: course_name.to_string(),
        })
    }

    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>> {
        let course = self
            .conn
            .query_row(
                "SELECT id, course_name FROM courses WHERE id = ?1;",
                [id],
                |row| {
                    Ok(Course {
                        id: row.get("id")?,
                        course_name: row.get("course_name")?,
                    })
                },
            )
            .optional()?;
        Ok(course)
    }

    fn create_section(&self, course_id: CourseId, section_name: &str) -> RepoResult<Section> {
        self.conn.execute(
            "INSERT INTO course_sections (section_name, course_id) VALUES (?1, ?2);",
            params![section_name, course_id],
        )?;
        Ok(Section {
            id: self.conn.last_insert_rowid(),
            section_name: section_name.to_string(),
            course_id,
        })
    }

    fn get_section(&self, id: SectionId) -> RepoResult<Option<Section>> {
        let section = self
            .conn
            .query_row(
                "SELECT id, section_name, course_id FROM course_sections WHERE id = ?1;",
                [id],
                parse_section_row,
            )
            .optional()?;
        Ok(section)
    }

    fn list_sections_for_course(&self, course_id: CourseId) -> RepoResult<Vec<Section>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, section_name, course_id
             FROM course_sections
             WHERE course_id = ?1
             ORDER BY section_name COLLATE NOCASE ASC, id ASC;",
        )?;
        let sections = stmt
            .query_map([course_id], parse_section_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sections)
    }

    fn create_school_year(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<SchoolYear> {
        self.conn.execute(
            "INSERT INTO school_years (school_year_start, school_year_end) VALUES (?1, ?2);",
            params![start, end],
        )?;
        Ok(SchoolYear {
            id: self.conn.last_insert_rowid(),
            start,
            end,
        })
    }

    fn get_school_year(&self, id: SchoolYearId) -> RepoResult<Option<SchoolYear>> {
        let year = self
            .conn
            .query_row(
                "SELECT id, school_year_start, school_year_end FROM school_years WHERE id = ?1;",
                [id],
                parse_school_year_row,
            )
            .optional()?;
        Ok(year)
    }

    fn list_school_years(&self) -> RepoResult<Vec<SchoolYear>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, school_year_start, school_year_end
             FROM school_years
             ORDER BY school_year_end DESC, id DESC;",
        )?;
        let years = stmt
            .query_map([], parse_school_year_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(years)
    }

    fn create_subject(
        &self,
        subject_name: &str,
        staff_id: UserId,
        course_id: CourseId,
    ) -> RepoResult<Subject> {
        self.conn.execute(
            "INSERT INTO subjects (subject_name, staff_id, course_id) VALUES (?1, ?2, ?3);",
            params![subject_name, staff_id, course_id],
        )?;
        Ok(Subject {
            id: self.conn.last_insert_rowid(),
            subject_name: subject_name.to_string(),
            staff_id,
            course_id,
            is_offered: true,
        })
    }

    fn get_subject(&self, id: SubjectId) -> RepoResult<Option<Subject>> {
        self.conn
            .query_row(
                &format!("{SUBJECT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_subject_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn set_subject_owner(&self, id: SubjectId, staff_id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE subjects
             SET
                staff_id = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, staff_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "subject",
                id,
            });
        }
        Ok(())
    }

    fn list_offered_subjects_for_staff(&self, staff_id: UserId) -> RepoResult<Vec<Subject>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SUBJECT_SELECT_SQL}
             WHERE staff_id = ?1
               AND is_offered = 1
             ORDER BY subject_name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([staff_id])?;
        let mut subjects = Vec::new();
        while let Some(row) = rows.next()? {
            subjects.push(parse_subject_row(row)?);
        }
        Ok(subjects)
    }

    fn register_student(&self, student: &NewStudent) -> RepoResult<(Account, StudentProfile)> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let account = insert_account(&tx, &student.account)?;

        tx.execute(
            "INSERT INTO students (
                user_id,
                course_id,
                section_id,
                school_year_id,
                year_level,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                account.id,
                student.course_id,
                student.section_id,
                student.school_year_id,
                student.year_level.code(),
                student.status.code(),
            ],
        )?;

        let subject_ids: BTreeSet<SubjectId> = student.subject_ids.iter().copied().collect();
        for subject_id in subject_ids {
            tx.execute(
                "INSERT INTO enrollments (student_id, subject_id, school_year_id)
                 VALUES (?1, ?2, ?3);",
                params![account.id, subject_id, student.school_year_id],
            )?;
        }
        tx.commit()?;

        let profile = StudentProfile {
            user_id: account.id,
            course_id: student.course_id,
            section_id: student.section_id,
            school_year_id: student.school_year_id,
            year_level: student.year_level,
            status: student.status,
        };
        Ok((account, profile))
    }

    fn get_student_profile(&self, user_id: UserId) -> RepoResult<Option<StudentProfile>> {
        self.conn
            .query_row(
                "SELECT user_id, course_id, section_id, school_year_id, year_level, status
                 FROM students
                 WHERE user_id = ?1;",
                [user_id],
                |row| Ok(parse_student_profile_row(row)),
            )
            .optional()?
            .transpose()
    }
}

fn insert_account(conn: &Connection, account: &NewAccount) -> RepoResult<Account> {
    conn.execute(
        "INSERT INTO users (email, first_name, middle_initial, last_name, role)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            account.email.as_str(),
            account.first_name.as_str(),
            account.middle_initial.as_str(),
            account.last_name.as_str(),
            account.role.level(),
        ],
    )
    .map_err(|err| {
        map_unique_violation(err, format!("email already registered: {}", account.email))
    })?;

    Ok(Account {
        id: conn.last_insert_rowid(),
        email: account.email.clone(),
        first_name: account.first_name.clone(),
        middle_initial: account.middle_initial.clone(),
        last_name: account.last_name.clone(),
        role: account.role,
        is_active: true,
    })
}

fn parse_account_row(row: &Row<'_>) -> RepoResult<Account> {
    let level: i64 = row.get("role")?;
    let role = Role::from_level(level)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid role `{level}` in users.role")))?;
    Ok(Account {
        id: row.get("id")?,
        email: row.get("email")?,
        first_name: row.get("first_name")?,
        middle_initial: row.get("middle_initial")?,
        last_name: row.get("last_name")?,
        role,
        is_active: int_to_bool("users.is_active", row.get("is_active")?)?,
    })
}

fn parse_section_row(row: &Row<'_>) -> rusqlite::Result<Section> {
    Ok(Section {
        id: row.get("id")?,
        section_name: row.get("section_name")?,
        course_id: row.get("course_id")?,
    })
}

fn parse_school_year_row(row: &Row<'_>) -> rusqlite::Result<SchoolYear> {
    Ok(SchoolYear {
        id: row.get("id")?,
        start: row.get("school_year_start")?,
        end: row.get("school_year_end")?,
    })
}

fn parse_subject_row(row: &Row<'_>) -> RepoResult<Subject> {
    Ok(Subject {
        id: row.get("id")?,
        subject_name: row.get("subject_name")?,
        staff_id: row.get("staff_id")?,
        course_id: row.get("course_id")?,
        is_offered: int_to_bool("subjects.is_offered", row.get("is_offered")?)?,
    })
}

fn parse_student_profile_row(row: &Row<'_>) -> RepoResult<StudentProfile> {
    let level_code: String = row.get("year_level")?;
    let year_level = YearLevel::parse(&level_code).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid year level `{level_code}` in students.year_level"
        ))
    })?;
    let status_code: String = row.get("status")?;
    let status = StudentStatus::parse(&status_code).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_code}` in students.status"))
    })?;
    Ok(StudentProfile {
        user_id: row.get("user_id")?,
        course_id: row.get("course_id")?,
        section_id: row.get("section_id")?,
        school_year_id: row.get("school_year_id")?,
        year_level,
        status,
    })
}
