//! Feedback threads from staff and students to administration.

use crate::model::account::{Role, UserId};
use serde::{Deserialize, Serialize};

pub type FeedbackId = i64;

/// A feedback message; `reply` is set once by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub author_id: UserId,
    pub author_role: Role,
    pub message: String,
    pub reply: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Feedback {
    pub fn is_replied(&self) -> bool {
        self.reply.is_some()
    }
}
