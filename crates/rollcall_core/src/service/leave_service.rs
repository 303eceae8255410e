//! Staff leave workflow.
//!
//! # Invariants
//! - Messages are trimmed and required.
//! - A decided application is final; deciding again is `Conflict`.

use crate::model::account::UserId;
use crate::model::leave::{LeaveDecision, LeaveId, LeaveRequest};
use crate::repo::leave_repo::LeaveRepository;
use crate::repo::RepoError;
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum LeaveError {
    Validation(String),
    NotFound(LeaveId),
    /// Duplicate application or already decided.
    Conflict(String),
    Repo(RepoError),
}

impl LeaveError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Repo(_) => "storage",
        }
    }
}

impl Display for LeaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::NotFound(id) => write!(f, "leave request not found: {id}"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LeaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LeaveError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::NotFound(id),
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Repo(other),
        }
    }
}

pub struct LeaveService<R: LeaveRepository> {
    repo: R,
}

impl<R: LeaveRepository> LeaveService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Files a leave application for `leave_date`.
    pub fn apply_leave(
        &self,
        staff_id: UserId,
        leave_date: NaiveDate,
        message: &str,
    ) -> Result<LeaveRequest, LeaveError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(LeaveError::Validation("leave message is required".to_string()));
        }
        match self.repo.create_leave(staff_id, leave_date, message) {
            Ok(request) => {
                info!(
                    "event=leave_apply module=service status=ok leave_id={} staff_id={staff_id}",
                    request.id
                );
                Ok(request)
            }
            Err(err) => {
                let err = LeaveError::from(err);
                warn!(
                    "event=leave_apply module=service status=error staff_id={staff_id} error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    pub fn list_leave(&self, staff_id: UserId) -> Result<Vec<LeaveRequest>, LeaveError> {
        Ok(self.repo.list_for_staff(staff_id)?)
    }

    pub fn list_pending_leave(&self) -> Result<Vec<LeaveRequest>, LeaveError> {
        Ok(self.repo.list_pending()?)
    }

    /// Approves or rejects a pending application.
    pub fn decide_leave(
        &self,
        id: LeaveId,
        decision: LeaveDecision,
    ) -> Result<LeaveRequest, LeaveError> {
        let request = self.repo.decide(id, decision)?;
        info!(
            "event=leave_decide module=service status=ok leave_id={id} result={}",
            request.status.as_str()
        );
        Ok(request)
    }
}
