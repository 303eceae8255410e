use super::{items, to_result, Call, HandlerResult};
use crate::api;
use rollcall_core::Role;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Deserialize)]
struct SubmitParams {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditParams {
    feedback_id: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyParams {
    feedback_id: i64,
    reply: String,
}

#[derive(Deserialize)]
struct ListParams {
    role: Role,
}

pub(super) fn try_handle(conn: &Connection, method: &str, call: &Call<'_>) -> Option<HandlerResult> {
    let result = match method {
        "feedback.submit" => handle_submit(conn, call),
        "feedback.edit" => handle_edit(conn, call),
        "feedback.reply" => handle_reply(conn, call),
        "feedback.list" => handle_list(conn, call),
        "feedback.mine" => call
            .actor()
            .and_then(|actor_id| items(api::feedback_mine(conn, actor_id)?)),
        _ => return None,
    };
    Some(result)
}

fn handle_submit(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: SubmitParams = call.params()?;
    to_result(api::feedback_submit(conn, actor_id, &p.message)?)
}

fn handle_edit(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: EditParams = call.params()?;
    to_result(api::feedback_edit(conn, actor_id, p.feedback_id, &p.message)?)
}

fn handle_reply(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: ReplyParams = call.params()?;
    to_result(api::feedback_reply(conn, actor_id, p.feedback_id, &p.reply)?)
}

fn handle_list(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: ListParams = call.params()?;
    items(api::feedback_list(conn, actor_id, p.role)?)
}
