use super::{items, to_result, Call, HandlerResult};
use crate::api;
use chrono::NaiveDate;
use rollcall_core::model::leave::LeaveDecision;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Deserialize)]
struct ApplyParams {
    date: NaiveDate,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecideParams {
    leave_id: i64,
    decision: LeaveDecision,
}

pub(super) fn try_handle(conn: &Connection, method: &str, call: &Call<'_>) -> Option<HandlerResult> {
    let result = match method {
        "leave.apply" => handle_apply(conn, call),
        "leave.list" => call
            .actor()
            .and_then(|actor_id| items(api::leave_list(conn, actor_id)?)),
        "leave.pending" => call
            .actor()
            .and_then(|actor_id| items(api::leave_pending(conn, actor_id)?)),
        "leave.decide" => handle_decide(conn, call),
        _ => return None,
    };
    Some(result)
}

fn handle_apply(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: ApplyParams = call.params()?;
    to_result(api::leave_apply(conn, actor_id, p.date, &p.message)?)
}

fn handle_decide(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: DecideParams = call.params()?;
    to_result(api::leave_decide(conn, actor_id, p.leave_id, p.decision)?)
}
