use super::{items, to_result, Call, HandlerResult};
use crate::api::{self, AttendanceCreateInput};
use chrono::NaiveDate;
use rollcall_core::{PresenceEntry, UserId};
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterParams {
    subject_id: i64,
    section_id: i64,
    school_year_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateParams {
    subject_id: i64,
    section_id: i64,
    school_year_id: i64,
    #[serde(default)]
    present_student_ids: Vec<UserId>,
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryParams {
    student_id: UserId,
    present: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileParams {
    session_id: i64,
    #[serde(default)]
    entries: Vec<EntryParams>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionParams {
    session_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionsParams {
    subject_id: i64,
    school_year_id: i64,
}

pub(super) fn try_handle(conn: &Connection, method: &str, call: &Call<'_>) -> Option<HandlerResult> {
    match method {
        "attendance.roster" => Some(handle_roster(conn, call)),
        "attendance.create" => Some(handle_create(conn, call)),
        "attendance.reconcile" => Some(handle_reconcile(conn, call)),
        "attendance.rosterState" => Some(handle_roster_state(conn, call)),
        "attendance.sessions" => Some(handle_sessions(conn, call)),
        "attendance.subjects" => Some(handle_subjects(conn, call)),
        _ => None,
    }
}

fn handle_roster(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: RosterParams = call.params()?;
    items(api::attendance_roster(
        conn,
        actor_id,
        p.subject_id,
        p.section_id,
        p.school_year_id,
    )?)
}

fn handle_create(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: CreateParams = call.params()?;
    to_result(api::attendance_create(
        conn,
        actor_id,
        AttendanceCreateInput {
            subject_id: p.subject_id,
            section_id: p.section_id,
            school_year_id: p.school_year_id,
            date: p.date,
            present_student_ids: p.present_student_ids,
        },
    ))
}

fn handle_reconcile(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: ReconcileParams = call.params()?;
    let entries: Vec<PresenceEntry> = p
        .entries
        .into_iter()
        .map(|entry| PresenceEntry {
            student_id: entry.student_id,
            present: entry.present,
        })
        .collect();
    to_result(api::attendance_reconcile(
        conn,
        actor_id,
        p.session_id,
        &entries,
    ))
}

fn handle_roster_state(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: SessionParams = call.params()?;
    items(api::attendance_roster_state(conn, actor_id, p.session_id)?)
}

fn handle_sessions(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: SessionsParams = call.params()?;
    items(api::attendance_sessions(
        conn,
        actor_id,
        p.subject_id,
        p.school_year_id,
    )?)
}

fn handle_subjects(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    items(api::attendance_subjects(conn, actor_id)?)
}
