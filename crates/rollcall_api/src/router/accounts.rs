use super::{to_result, Call, HandlerResult};
use crate::api::{self, ApiError};
use rollcall_core::model::catalog::{NewStudent, StudentStatus, YearLevel};
use rollcall_core::{NewAccount, Role, UserId};
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountParams {
    email: String,
    first_name: String,
    middle_initial: String,
    last_name: String,
}

impl AccountParams {
    fn into_account(self, role: Role) -> NewAccount {
        NewAccount {
            email: self.email,
            first_name: self.first_name,
            middle_initial: self.middle_initial,
            last_name: self.last_name,
            role,
        }
    }
}

#[derive(Deserialize)]
struct RegisterParams {
    #[serde(flatten)]
    account: AccountParams,
    role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudentParams {
    #[serde(flatten)]
    account: AccountParams,
    course_id: i64,
    section_id: i64,
    school_year_id: i64,
    year_level: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    subject_ids: Vec<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetActiveParams {
    user_id: UserId,
    is_active: bool,
}

pub(super) fn try_handle(conn: &Connection, method: &str, call: &Call<'_>) -> Option<HandlerResult> {
    let result = match method {
        "account.bootstrap" => handle_bootstrap(conn, call),
        "account.register" => handle_register(conn, call),
        "account.setActive" => handle_set_active(conn, call),
        "student.register" => handle_student(conn, call),
        _ => return None,
    };
    Some(result)
}

fn handle_bootstrap(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let p: AccountParams = call.params()?;
    to_result(api::account_bootstrap(conn, p.into_account(Role::Admin))?)
}

fn handle_register(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: RegisterParams = call.params()?;
    to_result(api::account_register(
        conn,
        actor_id,
        p.account.into_account(p.role),
    )?)
}

fn handle_set_active(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: SetActiveParams = call.params()?;
    to_result(api::account_set_active(conn, actor_id, p.user_id, p.is_active)?)
}

fn handle_student(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: StudentParams = call.params()?;
    let year_level = YearLevel::parse(&p.year_level).ok_or_else(|| {
        ApiError::new("bad_params", format!("unknown yearLevel `{}`", p.year_level))
    })?;
    let status = match p.status.as_deref() {
        None => StudentStatus::default(),
        Some(code) => StudentStatus::parse(code)
            .ok_or_else(|| ApiError::new("bad_params", format!("unknown status `{code}`")))?,
    };
    let input = NewStudent {
        account: p.account.into_account(Role::Student),
        course_id: p.course_id,
        section_id: p.section_id,
        school_year_id: p.school_year_id,
        year_level,
        status,
        subject_ids: p.subject_ids,
    };
    to_result(api::student_register(conn, actor_id, input)?)
}
