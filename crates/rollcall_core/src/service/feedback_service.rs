//! Feedback workflow: staff and students write, administration replies.

use crate::model::account::{Role, UserId};
use crate::model::feedback::{Feedback, FeedbackId};
use crate::repo::feedback_repo::FeedbackRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum FeedbackError {
    Validation(String),
    NotFound(FeedbackId),
    /// Caller is not the author.
    Forbidden(String),
    /// Feedback already has a reply.
    Conflict(String),
    Repo(RepoError),
}

impl FeedbackError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::Repo(_) => "storage",
        }
    }
}

impl Display for FeedbackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) | Self::Forbidden(message) | Self::Conflict(message) => {
                write!(f, "{message}")
            }
            Self::NotFound(id) => write!(f, "feedback not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FeedbackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FeedbackError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::NotFound(id),
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Repo(other),
        }
    }
}

pub struct FeedbackService<R: FeedbackRepository> {
    repo: R,
}

impl<R: FeedbackRepository> FeedbackService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn submit_feedback(
        &self,
        author_id: UserId,
        author_role: Role,
        message: &str,
    ) -> Result<Feedback, FeedbackError> {
        ensure_author_role(author_role)?;
        let message = required_text("feedback message", message)?;
        let feedback = self.repo.create_feedback(author_id, author_role, message)?;
        info!(
            "event=feedback_submit module=service status=ok feedback_id={} role={}",
            feedback.id,
            author_role.as_str()
        );
        Ok(feedback)
    }

    /// Rewrites the author's own message while it has no reply.
    pub fn edit_feedback(
        &self,
        author_id: UserId,
        id: FeedbackId,
        message: &str,
    ) -> Result<Feedback, FeedbackError> {
        let message = required_text("feedback message", message)?;
        let existing = self
            .repo
            .get_feedback(id)?
            .ok_or(FeedbackError::NotFound(id))?;
        if existing.author_id != author_id {
            return Err(FeedbackError::Forbidden(format!(
                "account {author_id} did not write feedback {id}"
            )));
        }
        if existing.is_replied() {
            return Err(FeedbackError::Conflict(format!(
                "feedback {id} already has a reply"
            )));
        }
        if !self.repo.update_message(id, author_id, message)? {
            return Err(FeedbackError::Conflict(format!(
                "feedback {id} changed while editing"
            )));
        }
        self.repo
            .get_feedback(id)?
            .ok_or(FeedbackError::NotFound(id))
    }

    pub fn reply_feedback(&self, id: FeedbackId, reply: &str) -> Result<Feedback, FeedbackError> {
        let reply = required_text("reply", reply)?;
        let feedback = self.repo.set_reply(id, reply)?;
        info!("event=feedback_reply module=service status=ok feedback_id={id}");
        Ok(feedback)
    }

    /// Feedback from all authors of `role` (staff or student).
    pub fn list_feedback(&self, role: Role) -> Result<Vec<Feedback>, FeedbackError> {
        ensure_author_role(role)?;
        Ok(self.repo.list_by_role(role)?)
    }

    pub fn list_own_feedback(&self, author_id: UserId) -> Result<Vec<Feedback>, FeedbackError> {
        Ok(self.repo.list_for_author(author_id)?)
    }
}

fn ensure_author_role(role: Role) -> Result<(), FeedbackError> {
    match role {
        Role::Staff | Role::Student => Ok(()),
        Role::Admin => Err(FeedbackError::Validation(
            "feedback is written by staff or students".to_string(),
        )),
    }
}

fn required_text<'a>(field: &str, value: &'a str) -> Result<&'a str, FeedbackError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FeedbackError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}
