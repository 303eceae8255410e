//! Attendance domain model.
//!
//! # Invariants
//! - At most one `AttendanceSession` exists per (subject, school year,
//!   calendar day). Storage enforces this with a unique index.
//! - A student is present in a session iff a `presence_records` row exists
//!   for the pair. There is no absent row and no boolean column.
//! - `owner_staff_id` is captured when the session is created and is not
//!   rewritten when the subject changes owner.

use crate::model::account::UserId;
use crate::model::catalog::{SchoolYearId, SectionId, SubjectId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type SessionId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSession {
    pub id: SessionId,
    pub subject_id: SubjectId,
    pub section_id: SectionId,
    pub school_year_id: SchoolYearId,
    pub owner_staff_id: UserId,
    pub session_date: NaiveDate,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Bumped when a reconciliation changes presence.
    pub updated_at: i64,
}

/// Input for the attendance writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendanceSession {
    pub subject_id: SubjectId,
    pub section_id: SectionId,
    pub school_year_id: SchoolYearId,
    pub session_date: NaiveDate,
    /// Students marked present. May be empty (e.g. a cancelled class).
    pub present_student_ids: Vec<UserId>,
}

/// One eligible student for an attendance entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub student_id: UserId,
    pub display_name: String,
}

/// One submitted correction: the desired presence of one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub student_id: UserId,
    pub present: bool,
}

/// Correction-UI row for an existing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterStateEntry {
    pub student_id: UserId,
    pub full_name: String,
    pub is_present: bool,
}

/// Presence changes applied by one reconciliation. Both lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceDelta {
    pub added: Vec<UserId>,
    pub removed: Vec<UserId>,
}

impl PresenceDelta {
    /// Diffs desired presence against the current present set.
    ///
    /// Only students named in `desired` can change; everyone else keeps
    /// their current state.
    pub fn between(current: &BTreeSet<UserId>, desired: &BTreeMap<UserId, bool>) -> Self {
        let mut delta = Self::default();
        for (&student_id, &present) in desired {
            let is_present = current.contains(&student_id);
            if present && !is_present {
                delta.added.push(student_id);
            } else if !present && is_present {
                delta.removed.push(student_id);
            }
        }
        delta
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Folds submitted entries into one desired state per student.
///
/// When a student appears more than once the last entry wins.
pub fn collapse_entries(entries: &[PresenceEntry]) -> BTreeMap<UserId, bool> {
    entries
        .iter()
        .map(|entry| (entry.student_id, entry.present))
        .collect()
}
