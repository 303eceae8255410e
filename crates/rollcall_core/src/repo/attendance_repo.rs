//! Attendance repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Resolve rosters from enrollments.
//! - Persist sessions with their presence records, and reconcile presence.
//!
//! # Invariants
//! - `create_session` inserts with `ON CONFLICT DO NOTHING` against the
//!   (subject, school year, day) unique index; a lost race is a `Conflict`.
//! - `create_session` and `reconcile_presence` run in one IMMEDIATE
//!   transaction each; a failure leaves no partial rows behind.
//! - Roster order is `last_name, first_name, id`.

use crate::model::account::{display_name, full_name, UserId};
use crate::model::attendance::{
    AttendanceSession, NewAttendanceSession, PresenceDelta, SessionId,
};
use crate::model::catalog::{SchoolYearId, SectionId, SubjectId};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use chrono::NaiveDate;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::collections::{BTreeMap, BTreeSet};

const SESSION_SELECT_SQL: &str = "SELECT
    id,
    subject_id,
    section_id,
    school_year_id,
    owner_staff_id,
    session_date,
    created_at,
    updated_at
FROM attendance_sessions";

const ROSTER_ORDER_SQL: &str =
    "ORDER BY u.last_name COLLATE NOCASE ASC, u.first_name COLLATE NOCASE ASC, u.id ASC";

/// Student name parts as needed by roster projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterStudent {
    pub student_id: UserId,
    pub first_name: String,
    pub middle_initial: String,
    pub last_name: String,
}

impl RosterStudent {
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.middle_initial, &self.last_name)
    }

    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.middle_initial, &self.last_name)
    }
}

/// Data access contract for attendance sessions and presence.
pub trait AttendanceRepository {
    /// Students enrolled in (subject, school year) whose section is `section_id`.
    fn roster(
        &self,
        subject_id: SubjectId,
        section_id: SectionId,
        school_year_id: SchoolYearId,
    ) -> RepoResult<Vec<RosterStudent>>;
    /// Existing students among `ids`, in roster order. Unknown ids are skipped.
    fn students_by_ids(&self, ids: &[UserId]) -> RepoResult<Vec<RosterStudent>>;
    fn find_session_on(
        &self,
        subject_id: SubjectId,
        school_year_id: SchoolYearId,
        session_date: NaiveDate,
    ) -> RepoResult<Option<AttendanceSession>>;
    fn get_session(&self, id: SessionId) -> RepoResult<Option<AttendanceSession>>;
    /// Sessions for (subject, school year), newest date first.
    fn list_sessions(
        &self,
        subject_id: SubjectId,
        school_year_id: SchoolYearId,
    ) -> RepoResult<Vec<AttendanceSession>>;

    /// Creates the session and one presence record per distinct student.
    fn create_session(
        &self,
        owner_staff_id: UserId,
        session: &NewAttendanceSession,
    ) -> RepoResult<AttendanceSession>;
    fn presence_set(&self, session_id: SessionId) -> RepoResult<BTreeSet<UserId>>;
    /// Diffs `desired` against stored presence and applies the delta.
    fn reconcile_presence(
        &self,
        session_id: SessionId,
        desired: &BTreeMap<UserId, bool>,
    ) -> RepoResult<PresenceDelta>;
}

/// SQLite-backed attendance repository.
pub struct SqliteAttendanceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttendanceRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AttendanceRepository for SqliteAttendanceRepository<'_> {
    fn roster(
        &self,
        subject_id: SubjectId,
        section_id: SectionId,
        school_year_id: SchoolYearId,
    ) -> RepoResult<Vec<RosterStudent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                u.id AS student_id,
                u.first_name,
                u.middle_initial,
                u.last_name
             FROM enrollments e
             INNER JOIN students s ON s.user_id = e.student_id
             INNER JOIN users u ON u.id = s.user_id
             WHERE e.subject_id = ?1
               AND s.section_id = ?2
               AND e.school_year_id = ?3
             {ROSTER_ORDER_SQL};"
        ))?;
        let students = stmt
            .query_map(
                params![subject_id, section_id, school_year_id],
                parse_roster_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(students)
    }

    fn students_by_ids(&self, ids: &[UserId]) -> RepoResult<Vec<RosterStudent>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                u.id AS student_id,
                u.first_name,
                u.middle_initial,
                u.last_name
             FROM students s
             INNER JOIN users u ON u.id = s.user_id
             WHERE s.user_id IN ({})
             {ROSTER_ORDER_SQL};",
            placeholders(ids.len())
        ))?;
        let students = stmt
            .query_map(params_from_iter(id_values(ids)), parse_roster_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(students)
    }

    fn find_session_on(
        &self,
        subject_id: SubjectId,
        school_year_id: SchoolYearId,
        session_date: NaiveDate,
    ) -> RepoResult<Option<AttendanceSession>> {
        find_session_on(self.conn, subject_id, school_year_id, session_date)
    }

    fn get_session(&self, id: SessionId) -> RepoResult<Option<AttendanceSession>> {
        load_session(self.conn, id)
    }

    fn list_sessions(
        &self,
        subject_id: SubjectId,
        school_year_id: SchoolYearId,
    ) -> RepoResult<Vec<AttendanceSession>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SESSION_SELECT_SQL}
             WHERE subject_id = ?1
               AND school_year_id = ?2
             ORDER BY session_date DESC, id DESC;"
        ))?;
        let sessions = stmt
            .query_map(params![subject_id, school_year_id], parse_session_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn create_session(
        &self,
        owner_staff_id: UserId,
        session: &NewAttendanceSession,
    ) -> RepoResult<AttendanceSession> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT INTO attendance_sessions (
                subject_id,
                section_id,
                school_year_id,
                owner_staff_id,
                session_date
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (subject_id, school_year_id, session_date) DO NOTHING;",
            params![
                session.subject_id,
                session.section_id,
                session.school_year_id,
                owner_staff_id,
                session.session_date,
            ],
        )?;
        if inserted == 0 {
            return Err(RepoError::Conflict(format!(
                "attendance session already exists for subject {} on {}",
                session.subject_id, session.session_date
            )));
        }
        let session_id = tx.last_insert_rowid();

        let present: BTreeSet<UserId> = session.present_student_ids.iter().copied().collect();
        {
            let mut insert = tx.prepare(
                "INSERT INTO presence_records (session_id, student_id) VALUES (?1, ?2);",
            )?;
            for student_id in &present {
                insert.execute(params![session_id, student_id])?;
            }
        }

        let created = load_session(&tx, session_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("session {session_id} missing after insert"))
        })?;
        tx.commit()?;

        debug!(
            "event=attendance_session_insert module=repo status=ok session_id={session_id} present_count={}",
            present.len()
        );
        Ok(created)
    }

    fn presence_set(&self, session_id: SessionId) -> RepoResult<BTreeSet<UserId>> {
        load_presence_set(self.conn, session_id)
    }

    fn reconcile_presence(
        &self,
        session_id: SessionId,
        desired: &BTreeMap<UserId, bool>,
    ) -> RepoResult<PresenceDelta> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_session(&tx, session_id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "attendance session",
                id: session_id,
            });
        }

        let current = load_presence_set(&tx, session_id)?;
        let delta = PresenceDelta::between(&current, desired);

        for student_id in &delta.added {
            tx.execute(
                "INSERT INTO presence_records (session_id, student_id) VALUES (?1, ?2);",
                params![session_id, student_id],
            )?;
        }
        for student_id in &delta.removed {
            tx.execute(
                "DELETE FROM presence_records WHERE session_id = ?1 AND student_id = ?2;",
                params![session_id, student_id],
            )?;
        }
        if !delta.is_empty() {
            tx.execute(
                "UPDATE attendance_sessions
                 SET updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                [session_id],
            )?;
        }
        tx.commit()?;

        Ok(delta)
    }
}

fn find_session_on(
    conn: &Connection,
    subject_id: SubjectId,
    school_year_id: SchoolYearId,
    session_date: NaiveDate,
) -> RepoResult<Option<AttendanceSession>> {
    let session = conn
        .query_row(
            &format!(
                "{SESSION_SELECT_SQL}
                 WHERE subject_id = ?1
                   AND school_year_id = ?2
                   AND session_date = ?3;"
            ),
            params![subject_id, school_year_id, session_date],
            parse_session_row,
        )
        .optional()?;
    Ok(session)
}

fn load_session(conn: &Connection, id: SessionId) -> RepoResult<Option<AttendanceSession>> {
    let session = conn
        .query_row(
            &format!("{SESSION_SELECT_SQL} WHERE id = ?1;"),
            [id],
            parse_session_row,
        )
        .optional()?;
    Ok(session)
}

fn load_presence_set(conn: &Connection, session_id: SessionId) -> RepoResult<BTreeSet<UserId>> {
    let mut stmt =
        conn.prepare("SELECT student_id FROM presence_records WHERE session_id = ?1;")?;
    let present = stmt
        .query_map([session_id], |row| row.get::<_, UserId>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(present)
}

fn parse_session_row(row: &Row<'_>) -> rusqlite::Result<AttendanceSession> {
    Ok(AttendanceSession {
        id: row.get("id")?,
        subject_id: row.get("subject_id")?,
        section_id: row.get("section_id")?,
        school_year_id: row.get("school_year_id")?,
        owner_staff_id: row.get("owner_staff_id")?,
        session_date: row.get("session_date")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_roster_row(row: &Row<'_>) -> rusqlite::Result<RosterStudent> {
    Ok(RosterStudent {
        student_id: row.get("student_id")?,
        first_name: row.get("first_name")?,
        middle_initial: row.get("middle_initial")?,
        last_name: row.get("last_name")?,
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn id_values(ids: &[UserId]) -> impl Iterator<Item = Value> + '_ {
    ids.iter().map(|id| Value::Integer(*id))
}
