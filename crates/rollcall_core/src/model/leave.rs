//! Staff leave application model.
//!
//! # Invariants
//! - One application per (staff, leave date).
//! - Only `Pending` applications can be decided; decisions are final.

use crate::model::account::UserId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type LeaveId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveDecision {
    Approve,
    Reject,
}

impl LeaveDecision {
    pub fn resulting_status(self) -> LeaveStatus {
        match self {
            Self::Approve => LeaveStatus::Approved,
            Self::Reject => LeaveStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: LeaveId,
    pub staff_id: UserId,
    pub leave_date: NaiveDate,
    pub message: String,
    pub status: LeaveStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::{LeaveDecision, LeaveStatus};

    #[test]
    fn decisions_map_to_final_statuses() {
        assert_eq!(LeaveDecision::Approve.resulting_status(), LeaveStatus::Approved);
        assert_eq!(LeaveDecision::Reject.resulting_status(), LeaveStatus::Rejected);
    }

    #[test]
    fn status_text_matches_stored_and_wire_forms() {
        for status in [LeaveStatus::Pending, LeaveStatus::Approved, LeaveStatus::Rejected] {
            assert_eq!(LeaveStatus::parse(status.as_str()), Some(status));
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_string())
            );
        }
        let decision: LeaveDecision = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(decision, LeaveDecision::Reject);
    }
}
