//! Feedback repository.
//!
//! # Invariants
//! - `update_message` only touches unreplied rows written by the given author.
//! - A reply is written once; replying again is `Conflict`.

use crate::model::account::{Role, UserId};
use crate::model::feedback::{Feedback, FeedbackId};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const FEEDBACK_SELECT_SQL: &str = "SELECT
    id,
    author_id,
    author_role,
    message,
    reply,
    created_at,
    updated_at
FROM feedback";

pub trait FeedbackRepository {
    fn create_feedback(
        &self,
        author_id: UserId,
        author_role: Role,
        message: &str,
    ) -> RepoResult<Feedback>;
    fn get_feedback(&self, id: FeedbackId) -> RepoResult<Option<Feedback>>;
    /// Rewrites the message. Returns `false` when the row is missing, owned by
    /// someone else or already replied.
    fn update_message(&self, id: FeedbackId, author_id: UserId, message: &str)
        -> RepoResult<bool>;
    fn set_reply(&self, id: FeedbackId, reply: &str) -> RepoResult<Feedback>;
    /// Feedback written by one author, newest first.
    fn list_for_author(&self, author_id: UserId) -> RepoResult<Vec<Feedback>>;
    /// Feedback written by authors of `role`, newest first.
    fn list_by_role(&self, role: Role) -> RepoResult<Vec<Feedback>>;
}

pub struct SqliteFeedbackRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFeedbackRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn list_where(&self, clause: &str, value: i64) -> RepoResult<Vec<Feedback>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FEEDBACK_SELECT_SQL} WHERE {clause} = ?1 ORDER BY created_at DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([value])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_feedback_row(row)?);
        }
        Ok(items)
    }
}

impl FeedbackRepository for SqliteFeedbackRepository<'_> {
    fn create_feedback(
        &self,
        author_id: UserId,
        author_role: Role,
        message: &str,
    ) -> RepoResult<Feedback> {
        self.conn.execute(
            "INSERT INTO feedback (author_id, author_role, message) VALUES (?1, ?2, ?3);",
            params![author_id, author_role.level(), message],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_feedback(id)?.ok_or(RepoError::NotFound {
            entity: "feedback",
            id,
        })
    }

    fn get_feedback(&self, id: FeedbackId) -> RepoResult<Option<Feedback>> {
        self.conn
            .query_row(
                &format!("{FEEDBACK_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_feedback_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn update_message(
        &self,
        id: FeedbackId,
        author_id: UserId,
        message: &str,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE feedback
             SET
                message = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND author_id = ?2
               AND reply IS NULL;",
            params![id, author_id, message],
        )?;
        Ok(changed > 0)
    }

    fn set_reply(&self, id: FeedbackId, reply: &str) -> RepoResult<Feedback> {
        let changed = self.conn.execute(
            "UPDATE feedback
             SET
                reply = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND reply IS NULL;",
            params![id, reply],
        )?;
        let Some(feedback) = self.get_feedback(id)? else {
            return Err(RepoError::NotFound {
                entity: "feedback",
                id,
            });
        };
        if changed == 0 {
            return Err(RepoError::Conflict(format!(
                "feedback {id} already has a reply"
            )));
        }
        Ok(feedback)
    }

    fn list_for_author(&self, author_id: UserId) -> RepoResult<Vec<Feedback>> {
        self.list_where("author_id", author_id)
    }

    fn list_by_role(&self, role: Role) -> RepoResult<Vec<Feedback>> {
        self.list_where("author_role", role.level())
    }
}

fn parse_feedback_row(row: &Row<'_>) -> RepoResult<Feedback> {
    let level: i64 = row.get("author_role")?;
    let author_role = Role::from_level(level).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{level}` in feedback.author_role"))
    })?;
    Ok(Feedback {
        id: row.get("id")?,
        author_id: row.get("author_id")?,
        author_role,
        message: row.get("message")?,
        reply: row.get("reply")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
