//! Leave application repository.
//!
//! # Invariants
//! - (staff, leave date) is unique; a second application is `Conflict`.
//! - `decide` only transitions rows still in `pending`.

use crate::model::account::UserId;
use crate::model::leave::{LeaveDecision, LeaveId, LeaveRequest, LeaveStatus};
use crate::repo::{ensure_connection_ready, map_unique_violation, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const LEAVE_SELECT_SQL: &str = "SELECT
    id,
    staff_id,
    leave_date,
    message,
    status,
    created_at,
    updated_at
FROM leave_requests";

pub trait LeaveRepository {
    fn create_leave(
        &self,
        staff_id: UserId,
        leave_date: NaiveDate,
        message: &str,
    ) -> RepoResult<LeaveRequest>;
    fn get_leave(&self, id: LeaveId) -> RepoResult<Option<LeaveRequest>>;
    /// Applications of one staff member, latest leave date first.
    fn list_for_staff(&self, staff_id: UserId) -> RepoResult<Vec<LeaveRequest>>;
    /// Pending applications, oldest leave date first.
    fn list_pending(&self) -> RepoResult<Vec<LeaveRequest>>;
    /// Moves a pending application to its decided status.
    fn decide(&self, id: LeaveId, decision: LeaveDecision) -> RepoResult<LeaveRequest>;
}

pub struct SqliteLeaveRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLeaveRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_list(&self, sql: &str, bind: &[&dyn rusqlite::ToSql]) -> RepoResult<Vec<LeaveRequest>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut requests = Vec::new();
        while let Some(row) = rows.next()? {
            requests.push(parse_leave_row(row)?);
        }
        Ok(requests)
    }
}

impl LeaveRepository for SqliteLeaveRepository<'_> {
    fn create_leave(
        &self,
        staff_id: UserId,
        leave_date: NaiveDate,
        message: &str,
    ) -> RepoResult<LeaveRequest> {
        self.conn
            .execute(
                "INSERT INTO leave_requests (staff_id, leave_date, message) VALUES (?1, ?2, ?3);",
                params![staff_id, leave_date, message],
            )
            .map_err(|err| {
                map_unique_violation(err, format!("leave already applied for {leave_date}"))
            })?;
        let id = self.conn.last_insert_rowid();
        self.get_leave(id)?.ok_or(RepoError::NotFound {
            entity: "leave request",
            id,
        })
    }

    fn get_leave(&self, id: LeaveId) -> RepoResult<Option<LeaveRequest>> {
        self.conn
            .query_row(
                &format!("{LEAVE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_leave_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_for_staff(&self, staff_id: UserId) -> RepoResult<Vec<LeaveRequest>> {
        self.query_list(
            &format!("{LEAVE_SELECT_SQL} WHERE staff_id = ?1 ORDER BY leave_date DESC, id DESC;"),
            &[&staff_id],
        )
    }

    fn list_pending(&self) -> RepoResult<Vec<LeaveRequest>> {
        self.query_list(
            &format!(
                "{LEAVE_SELECT_SQL} WHERE status = 'pending' ORDER BY leave_date ASC, id ASC;"
            ),
            &[],
        )
    }

    fn decide(&self, id: LeaveId, decision: LeaveDecision) -> RepoResult<LeaveRequest> {
        let changed = self.conn.execute(
            "UPDATE leave_requests
             SET
                status = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND status = 'pending';",
            params![id, decision.resulting_status().as_str()],
        )?;

        let Some(request) = self.get_leave(id)? else {
            return Err(RepoError::NotFound {
                entity: "leave request",
                id,
            });
        };
        if changed == 0 {
            return Err(RepoError::Conflict(format!(
                "leave request {id} already {}",
                request.status.as_str()
            )));
        }
        Ok(request)
    }
}

fn parse_leave_row(row: &Row<'_>) -> RepoResult<LeaveRequest> {
    let raw_status: String = row.get("status")?;
    let status = LeaveStatus::parse(&raw_status).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{raw_status}` in leave_requests.status"))
    })?;
    Ok(LeaveRequest {
        id: row.get("id")?,
        staff_id: row.get("staff_id")?,
        leave_date: row.get("leave_date")?,
        message: row.get("message")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
