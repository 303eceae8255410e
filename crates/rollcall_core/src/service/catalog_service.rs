//! Registration and catalog seeding.
//!
//! # Responsibility
//! - Validate and create accounts and student registrations.
//! - Create the courses, sections, school years and subjects that rosters
//!   are resolved from.
//!
//! # Invariants
//! - Student registration is atomic: account, profile and enrollments are
//!   written together or not at all.
//! - A subject's owner is always an active staff account.

use crate::model::account::{Account, AccountValidationError, NewAccount, Role, UserId};
use crate::model::catalog::{
    Course, CourseId, NewStudent, SchoolYear, Section, StudentProfile, Subject, SubjectId,
};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::RepoError;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum RegistrationError {
    /// Account input failed normalization.
    InvalidAccount(AccountValidationError),
    Validation(String),
    NotFound { entity: &'static str, id: i64 },
    /// Duplicate email.
    Conflict(String),
    Repo(RepoError),
}

impl RegistrationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAccount(_) | Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Repo(_) => "storage",
        }
    }
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAccount(err) => write!(f, "{err}"),
            Self::Validation(message) | Self::Conflict(message) => write!(f, "{message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidAccount(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AccountValidationError> for RegistrationError {
    fn from(value: AccountValidationError) -> Self {
        Self::InvalidAccount(value)
    }
}

impl From<RepoError> for RegistrationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Repo(other),
        }
    }
}

type RegistrationResult<T> = Result<T, RegistrationError>;

pub struct CatalogService<R: CatalogRepository> {
    repo: R,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers an account of any role.
    pub fn register_account(&self, input: NewAccount) -> RegistrationResult<Account> {
        let input = input.normalized()?;
        let account = self
            .repo
            .create_account(&input)
            .map_err(RegistrationError::from)
            .inspect_err(|err| {
                warn!(
                    "event=account_register module=service status=error role={} error_code={}",
                    input.role.as_str(),
                    err.code()
                )
            })?;
        info!(
            "event=account_register module=service status=ok user_id={} role={}",
            account.id,
            account.role.as_str()
        );
        Ok(account)
    }

    /// Creates the first administrator of an empty database.
    ///
    /// Fails with `Conflict` once any account exists.
    pub fn bootstrap_admin(&self, mut input: NewAccount) -> RegistrationResult<Account> {
        input.role = Role::Admin;
        let input = input.normalized()?;
        let account = self
            .repo
            .create_initial_account(&input)
            .map_err(RegistrationError::from)
            .inspect_err(|err| {
                warn!(
                    "event=admin_bootstrap module=service status=error error_code={}",
                    err.code()
                )
            })?;
        info!(
            "event=admin_bootstrap module=service status=ok user_id={}",
            account.id
        );
        Ok(account)
    }

    pub fn get_account(&self, id: UserId) -> RegistrationResult<Account> {
        self.repo.get_account(id)?.ok_or(RegistrationError::NotFound {
            entity: "account",
            id,
        })
    }

    pub fn set_account_active(&self, id: UserId, is_active: bool) -> RegistrationResult<Account> {
        self.repo.set_account_active(id, is_active)?;
        info!("event=account_active module=service status=ok user_id={id} is_active={is_active}");
        self.get_account(id)
    }

    /// Registers a student account with its profile and subject enrollments.
    ///
    /// The account role is forced to `Student`. Every subject must exist and
    /// belong to the student's course; the section must belong to it too.
    pub fn register_student(
        &self,
        mut input: NewStudent,
    ) -> RegistrationResult<(Account, StudentProfile)> {
        input.account.role = Role::Student;
        input.account = input.account.normalized()?;

        self.require_course(input.course_id)?;
        let section = self
            .repo
            .get_section(input.section_id)?
            .ok_or(RegistrationError::NotFound {
                entity: "section",
                id: input.section_id,
            })?;
        if section.course_id != input.course_id {
            return Err(RegistrationError::Validation(format!(
                "section {} does not belong to course {}",
                section.id, input.course_id
            )));
        }
        if self.repo.get_school_year(input.school_year_id)?.is_none() {
            return Err(RegistrationError::NotFound {
                entity: "school year",
                id: input.school_year_id,
            });
        }

        let subject_ids: BTreeSet<SubjectId> = input.subject_ids.iter().copied().collect();
        for subject_id in &subject_ids {
            let subject = self.require_subject(*subject_id)?;
            if subject.course_id != input.course_id {
                return Err(RegistrationError::Validation(format!(
                    "subject {} is not offered to course {}",
                    subject.id, input.course_id
                )));
            }
        }
        input.subject_ids = subject_ids.into_iter().collect();

        let (account, profile) = self.repo.register_student(&input)?;
        info!(
            "event=student_register module=service status=ok user_id={} section_id={} enrollments={}",
            account.id,
            profile.section_id,
            input.subject_ids.len()
        );
        Ok((account, profile))
    }

    pub fn get_student_profile(&self, user_id: UserId) -> RegistrationResult<StudentProfile> {
        self.repo
            .get_student_profile(user_id)?
            .ok_or(RegistrationError::NotFound {
                entity: "student",
                id: user_id,
            })
    }

    pub fn create_course(&self, course_name: &str) -> RegistrationResult<Course> {
        let name = required_name("course_name", course_name)?;
        Ok(self.repo.create_course(name)?)
    }

    pub fn create_section(
        &self,
        course_id: CourseId,
        section_name: &str,
    ) -> RegistrationResult<Section> {
        let name = required_name("section_name", section_name)?;
        self.require_course(course_id)?;
        Ok(self.repo.create_section(course_id, name)?)
    }

    pub fn create_school_year(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RegistrationResult<SchoolYear> {
        if end <= start {
            return Err(RegistrationError::Validation(format!(
                "school year must end after it starts ({start} .. {end})"
            )));
        }
        Ok(self.repo.create_school_year(start, end)?)
    }

    /// Creates an offered subject owned by `staff_id`.
    pub fn create_subject(
        &self,
        subject_name: &str,
        staff_id: UserId,
        course_id: CourseId,
    ) -> RegistrationResult<Subject> {
        let name = required_name("subject_name", subject_name)?;
        self.require_staff(staff_id)?;
        self.require_course(course_id)?;
        Ok(self.repo.create_subject(name, staff_id, course_id)?)
    }

    /// Hands a subject to another staff member. Sessions already recorded
    /// keep their original owner.
    pub fn reassign_subject(
        &self,
        subject_id: SubjectId,
        staff_id: UserId,
    ) -> RegistrationResult<Subject> {
        let subject = self.require_subject(subject_id)?;
        self.require_staff(staff_id)?;
        self.repo.set_subject_owner(subject_id, staff_id)?;
        info!(
            "event=subject_reassign module=service status=ok subject_id={subject_id} staff_id={staff_id}"
        );
        Ok(Subject { staff_id, ..subject })
    }

    fn require_course(&self, id: CourseId) -> RegistrationResult<Course> {
        self.repo.get_course(id)?.ok_or(RegistrationError::NotFound {
            entity: "course",
            id,
        })
    }

    fn require_subject(&self, id: SubjectId) -> RegistrationResult<Subject> {
        self.repo.get_subject(id)?.ok_or(RegistrationError::NotFound {
            entity: "subject",
            id,
        })
    }

    fn require_staff(&self, id: UserId) -> RegistrationResult<Account> {
        let account = self.get_account(id)?;
        if account.role != Role::Staff || !account.is_active {
            return Err(RegistrationError::Validation(format!(
                "account {id} is not an active staff member"
            )));
        }
        Ok(account)
    }
}

fn required_name<'a>(field: &str, value: &'a str) -> RegistrationResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RegistrationError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}
