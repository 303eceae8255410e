//! JSON line protocol.
//!
//! Request: `{"id", "method", "actorId", "params"}`. Reply:
//! `{"id", "ok": true, "result"}` or `{"id", "ok": false, "error": {"code",
//! "message"}}`. A request without `id` gets a generated UUID so replies and
//! log lines can still be correlated.

mod accounts;
mod attendance;
mod catalog;
mod envelope;
mod feedback;
mod leave;

use crate::api::ApiError;
use log::{info, warn};
use rollcall_core::{core_version, UserId};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub id: Option<String>,
    pub method: String,
    #[serde(default)]
    pub actor_id: Option<UserId>,
    #[serde(default)]
    pub params: Value,
}

type HandlerResult = Result<Value, ApiError>;

/// Arguments shared by every handler.
struct Call<'a> {
    actor_id: Option<UserId>,
    params: &'a Value,
}

impl Call<'_> {
    fn actor(&self) -> Result<UserId, ApiError> {
        self.actor_id
            .ok_or_else(|| ApiError::new("bad_params", "missing actorId"))
    }

    fn params<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.params.clone())
            .map_err(|err| ApiError::new("bad_params", err.to_string()))
    }
}

/// Parses one request line and answers it. Malformed JSON yields a
/// `bad_json` error reply.
pub fn handle_line(conn: &Connection, line: &str) -> Value {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle_request(conn, request),
        Err(err) => {
            warn!("event=request module=api status=error error_code=bad_json");
            envelope::err(&Uuid::new_v4().to_string(), "bad_json", err.to_string())
        }
    }
}

pub fn handle_request(conn: &Connection, request: Request) -> Value {
    let id = request
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let started_at = Instant::now();
    let call = Call {
        actor_id: request.actor_id,
        params: &request.params,
    };

    let outcome = dispatch(conn, request.method.as_str(), &call).unwrap_or_else(|| {
        Err(ApiError::new(
            "not_implemented",
            format!("unknown method: {}", request.method),
        ))
    });

    let duration_ms = started_at.elapsed().as_millis();
    match outcome {
        Ok(result) => {
            info!(
                "event=request module=api status=ok request_id={id} method={} duration_ms={duration_ms}",
                request.method
            );
            envelope::ok(&id, result)
        }
        Err(err) => {
            warn!(
                "event=request module=api status=error request_id={id} method={} duration_ms={duration_ms} error_code={}",
                request.method, err.code
            );
            envelope::err(&id, err.code, err.message)
        }
    }
}

fn dispatch(conn: &Connection, method: &str, call: &Call<'_>) -> Option<HandlerResult> {
    if method == "health" {
        return Some(Ok(json!({ "version": core_version() })));
    }
    attendance::try_handle(conn, method, call)
        .or_else(|| accounts::try_handle(conn, method, call))
        .or_else(|| catalog::try_handle(conn, method, call))
        .or_else(|| leave::try_handle(conn, method, call))
        .or_else(|| feedback::try_handle(conn, method, call))
}

fn to_result<T: Serialize>(value: T) -> HandlerResult {
    serde_json::to_value(value).map_err(|err| ApiError::new("internal", err.to_string()))
}

fn items<T: Serialize>(items: Vec<T>) -> HandlerResult {
    Ok(json!({ "items": to_result(items)? }))
}
