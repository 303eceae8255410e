//! Attendance use-case service.
//!
//! # Responsibility
//! - Roster resolution for a staff member's subject, section and school year.
//! - Session guard, batch writer and presence reconciler.
//! - Read models for the correction screen and session history.
//!
//! # Invariants
//! - Validation and not-found checks complete before any row is written.
//! - The unique session index is the final duplicate arbiter; a lost insert
//!   race surfaces as `AttendanceError::Duplicate`.
//! - Sessions keep the owner recorded at creation. Corrections and reads of a
//!   session are allowed only for that owner.
//! - Log lines carry ids and counts, never student names.

use crate::model::account::UserId;
use crate::model::attendance::{
    collapse_entries, AttendanceSession, NewAttendanceSession, PresenceDelta, PresenceEntry,
    RosterEntry, RosterStateEntry, SessionId,
};
use crate::model::catalog::{CourseId, SchoolYear, SchoolYearId, Section, SectionId, Subject, SubjectId};
use crate::repo::attendance_repo::{AttendanceRepository, RosterStudent};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::RepoError;
use chrono::{Local, NaiveDate};
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type AttendanceResult<T> = Result<T, AttendanceError>;

/// Errors returned by attendance use-cases.
#[derive(Debug)]
pub enum AttendanceError {
    /// Input is well-formed but violates a roster or catalog rule.
    Validation(String),
    /// Referenced subject, section, school year, session or student is missing.
    NotFound { entity: &'static str, id: i64 },
    /// Requester does not own the subject or session.
    Forbidden(String),
    /// A session already exists for this subject and school year on that day.
    Duplicate {
        subject_id: SubjectId,
        session_date: NaiveDate,
    },
    /// Storage failure.
    Repo(RepoError),
}

impl AttendanceError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Duplicate { .. } => "duplicate",
            Self::Repo(_) => "storage",
        }
    }
}

impl Display for AttendanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Forbidden(message) => write!(f, "{message}"),
            Self::Duplicate {
                subject_id,
                session_date,
            } => write!(
                f,
                "attendance for subject {subject_id} on {session_date} already recorded"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AttendanceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AttendanceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Repo(other),
        }
    }
}

/// Attendance service facade over catalog and attendance repositories.
pub struct AttendanceService<C: CatalogRepository, A: AttendanceRepository> {
    catalog: C,
    attendance: A,
}

impl<C: CatalogRepository, A: AttendanceRepository> AttendanceService<C, A> {
    pub fn new(catalog: C, attendance: A) -> Self {
        Self {
            catalog,
            attendance,
        }
    }

    /// Resolves students eligible to be marked for one class meeting.
    ///
    /// Returns an empty list when `staff_id` does not own the subject or when
    /// nobody is enrolled. An unknown subject is `NotFound`.
    pub fn roster(
        &self,
        staff_id: UserId,
        subject_id: SubjectId,
        section_id: SectionId,
        school_year_id: SchoolYearId,
    ) -> AttendanceResult<Vec<RosterEntry>> {
        let subject = self.require_subject(subject_id)?;
        if subject.staff_id != staff_id {
            info!(
                "event=attendance_roster module=service status=ok subject_id={subject_id} count=0 owner_match=false"
            );
            return Ok(Vec::new());
        }

        let students = self
            .attendance
            .roster(subject_id, section_id, school_year_id)?;
        info!(
            "event=attendance_roster module=service status=ok subject_id={subject_id} section_id={section_id} count={}",
            students.len()
        );
        Ok(students
            .into_iter()
            .map(|student| RosterEntry {
                student_id: student.student_id,
                display_name: student.display_name(),
            })
            .collect())
    }

    /// Reports whether `staff_id` already recorded attendance for the subject
    /// and school year on `session_date`.
    pub fn session_exists(
        &self,
        subject_id: SubjectId,
        school_year_id: SchoolYearId,
        staff_id: UserId,
        session_date: NaiveDate,
    ) -> AttendanceResult<bool> {
        let Some(subject) = self.catalog.get_subject(subject_id)? else {
            return Ok(false);
        };
        if subject.staff_id != staff_id {
            return Ok(false);
        }
        Ok(self
            .attendance
            .find_session_on(subject_id, school_year_id, session_date)?
            .is_some())
    }

    /// Records a new session and its presence records as one atomic batch.
    ///
    /// # Errors
    /// - `NotFound` for a missing subject, section, school year or student.
    /// - `Forbidden` when `staff_id` does not own the subject.
    /// - `Validation` when the section is outside the subject's course, the
    ///   date is in the future or outside the school year, or a student is
    ///   not on the roster.
    /// - `Duplicate` when the session already exists.
    pub fn create_attendance(
        &self,
        staff_id: UserId,
        request: &NewAttendanceSession,
    ) -> AttendanceResult<AttendanceSession> {
        let started_at = Instant::now();
        let result = self.create_attendance_inner(staff_id, request);
        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(session) => info!(
                "event=attendance_create module=service status=ok session_id={} subject_id={} present_count={} duration_ms={duration_ms}",
                session.id,
                session.subject_id,
                request.present_student_ids.len()
            ),
            Err(err) => warn!(
                "event=attendance_create module=service status=error subject_id={} duration_ms={duration_ms} error_code={}",
                request.subject_id,
                err.code()
            ),
        }
        result
    }

    fn create_attendance_inner(
        &self,
        staff_id: UserId,
        request: &NewAttendanceSession,
    ) -> AttendanceResult<AttendanceSession> {
        let subject = self.require_subject(request.subject_id)?;
        let section = self.require_section(request.section_id)?;
        let school_year = self.require_school_year(request.school_year_id)?;

        if subject.staff_id != staff_id {
            return Err(AttendanceError::Forbidden(format!(
                "staff {staff_id} does not own subject {}",
                subject.id
            )));
        }
        if section.course_id != subject.course_id {
            return Err(AttendanceError::Validation(format!(
                "section {} does not belong to the course of subject {}",
                section.id, subject.id
            )));
        }

        let session_date = request.session_date;
        if session_date > Local::now().date_naive() {
            return Err(AttendanceError::Validation(format!(
                "attendance cannot be recorded for a future date ({session_date})"
            )));
        }
        if session_date < school_year.start || session_date > school_year.end {
            return Err(AttendanceError::Validation(format!(
                "{session_date} is outside school year {}",
                school_year.label()
            )));
        }

        let present: BTreeSet<UserId> = request.present_student_ids.iter().copied().collect();
        let present_ids: Vec<UserId> = present.iter().copied().collect();
        self.require_students(&present_ids)?;

        let roster = self.roster_ids(subject.id, section.id, request.school_year_id)?;
        if let Some(outsider) = present.iter().find(|id| !roster.contains(*id)) {
            return Err(AttendanceError::Validation(format!(
                "student {outsider} is not enrolled in subject {} for section {}",
                subject.id, section.id
            )));
        }

        let normalized = NewAttendanceSession {
            present_student_ids: present_ids,
            ..request.clone()
        };
        self.attendance
            .create_session(staff_id, &normalized)
            .map_err(|err| match err {
                RepoError::Conflict(_) => AttendanceError::Duplicate {
                    subject_id: subject.id,
                    session_date: request.session_date,
                },
                other => other.into(),
            })
    }

    /// Applies add/remove corrections to an existing session.
    ///
    /// Entries are collapsed per student with the last one winning. Students
    /// not mentioned keep their current state. Students being marked present
    /// must be on the session's section roster. Replaying the same payload
    /// returns an empty delta.
    pub fn reconcile(
        &self,
        staff_id: UserId,
        session_id: SessionId,
        entries: &[PresenceEntry],
    ) -> AttendanceResult<PresenceDelta> {
        let started_at = Instant::now();
        let result = self.reconcile_inner(staff_id, session_id, entries);
        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(delta) => info!(
                "event=attendance_reconcile module=service status=ok session_id={session_id} added={} removed={} duration_ms={duration_ms}",
                delta.added.len(),
                delta.removed.len()
            ),
            Err(err) => warn!(
                "event=attendance_reconcile module=service status=error session_id={session_id} duration_ms={duration_ms} error_code={}",
                err.code()
            ),
        }
        result
    }

    fn reconcile_inner(
        &self,
        staff_id: UserId,
        session_id: SessionId,
        entries: &[PresenceEntry],
    ) -> AttendanceResult<PresenceDelta> {
        let session = self.require_owned_session(staff_id, session_id)?;
        let desired = collapse_entries(entries);

        let mentioned: Vec<UserId> = desired.keys().copied().collect();
        self.require_students(&mentioned)?;

        let current = self.attendance.presence_set(session.id)?;
        let additions: Vec<UserId> = desired
            .iter()
            .filter(|(id, present)| **present && !current.contains(*id))
            .map(|(id, _)| *id)
            .collect();
        if !additions.is_empty() {
            let roster = self.roster_ids(
                session.subject_id,
                session.section_id,
                session.school_year_id,
            )?;
            if let Some(outsider) = additions.iter().find(|id| !roster.contains(*id)) {
                return Err(AttendanceError::Validation(format!(
                    "student {outsider} is not enrolled in subject {} for section {}",
                    session.subject_id, session.section_id
                )));
            }
        }

        Ok(self.attendance.reconcile_presence(session.id, &desired)?)
    }

    /// Roster of a recorded session with each student's presence flag.
    ///
    /// Includes students who hold a presence record but are no longer on the
    /// roster, so every stored record stays visible and correctable.
    pub fn roster_state(
        &self,
        staff_id: UserId,
        session_id: SessionId,
    ) -> AttendanceResult<Vec<RosterStateEntry>> {
        let session = self.require_owned_session(staff_id, session_id)?;
        let present = self.attendance.presence_set(session.id)?;

        let mut students = self.attendance.roster(
            session.subject_id,
            session.section_id,
            session.school_year_id,
        )?;
        let listed: BTreeSet<UserId> = students.iter().map(|s| s.student_id).collect();
        let stragglers: Vec<UserId> = present.difference(&listed).copied().collect();
        if !stragglers.is_empty() {
            students.extend(self.attendance.students_by_ids(&stragglers)?);
            students.sort_by_cached_key(roster_sort_key);
        }

        Ok(students
            .into_iter()
            .map(|student| RosterStateEntry {
                student_id: student.student_id,
                is_present: present.contains(&student.student_id),
                full_name: student.full_name(),
            })
            .collect())
    }

    /// Offered subjects owned by `staff_id`, by name.
    pub fn list_staff_subjects(&self, staff_id: UserId) -> AttendanceResult<Vec<Subject>> {
        Ok(self.catalog.list_offered_subjects_for_staff(staff_id)?)
    }

    /// Sessions recorded by `staff_id` for a subject and school year, newest
    /// first. Sessions recorded by a previous owner are not listed.
    pub fn list_sessions(
        &self,
        staff_id: UserId,
        subject_id: SubjectId,
        school_year_id: SchoolYearId,
    ) -> AttendanceResult<Vec<AttendanceSession>> {
        self.require_subject(subject_id)?;
        let sessions = self.attendance.list_sessions(subject_id, school_year_id)?;
        Ok(sessions
            .into_iter()
            .filter(|session| session.owner_staff_id == staff_id)
            .collect())
    }

    pub fn list_sections_for_course(&self, course_id: CourseId) -> AttendanceResult<Vec<Section>> {
        if self.catalog.get_course(course_id)?.is_none() {
            return Err(AttendanceError::NotFound {
                entity: "course",
                id: course_id,
            });
        }
        Ok(self.catalog.list_sections_for_course(course_id)?)
    }

    pub fn list_school_years(&self) -> AttendanceResult<Vec<SchoolYear>> {
        Ok(self.catalog.list_school_years()?)
    }

    fn require_subject(&self, id: SubjectId) -> AttendanceResult<Subject> {
        self.catalog
            .get_subject(id)?
            .ok_or(AttendanceError::NotFound {
                entity: "subject",
                id,
            })
    }

    fn require_section(&self, id: SectionId) -> AttendanceResult<Section> {
        self.catalog
            .get_section(id)?
            .ok_or(AttendanceError::NotFound {
                entity: "section",
                id,
            })
    }

    fn require_school_year(&self, id: SchoolYearId) -> AttendanceResult<SchoolYear> {
        self.catalog
            .get_school_year(id)?
            .ok_or(AttendanceError::NotFound {
                entity: "school year",
                id,
            })
    }

    fn require_owned_session(
        &self,
        staff_id: UserId,
        session_id: SessionId,
    ) -> AttendanceResult<AttendanceSession> {
        let session =
            self.attendance
                .get_session(session_id)?
                .ok_or(AttendanceError::NotFound {
                    entity: "attendance session",
                    id: session_id,
                })?;
        if session.owner_staff_id != staff_id {
            return Err(AttendanceError::Forbidden(format!(
                "staff {staff_id} did not record session {session_id}"
            )));
        }
        Ok(session)
    }

    fn roster_ids(
        &self,
        subject_id: SubjectId,
        section_id: SectionId,
        school_year_id: SchoolYearId,
    ) -> AttendanceResult<BTreeSet<UserId>> {
        Ok(self
            .attendance
            .roster(subject_id, section_id, school_year_id)?
            .into_iter()
            .map(|student| student.student_id)
            .collect())
    }

    /// Fails with `NotFound` on the first id that is not a registered student.
    fn require_students(&self, ids: &[UserId]) -> AttendanceResult<()> {
        let found: BTreeSet<UserId> = self
            .attendance
            .students_by_ids(ids)?
            .into_iter()
            .map(|student| student.student_id)
            .collect();
        match ids.iter().find(|id| !found.contains(*id)) {
            Some(missing) => Err(AttendanceError::NotFound {
                entity: "student",
                id: *missing,
            }),
            None => Ok(()),
        }
    }
}

fn roster_sort_key(student: &RosterStudent) -> (String, String, UserId) {
    (
        student.last_name.to_ascii_lowercase(),
        student.first_name.to_ascii_lowercase(),
        student.student_id,
    )
}
