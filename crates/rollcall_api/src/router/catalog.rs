use super::{items, to_result, Call, HandlerResult};
use crate::api;
use chrono::NaiveDate;
use rollcall_core::UserId;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectionsParams {
    course_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCourseParams {
    course_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSectionParams {
    course_id: i64,
    section_name: String,
}

#[derive(Deserialize)]
struct CreateSchoolYearParams {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSubjectParams {
    subject_name: String,
    staff_id: UserId,
    course_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReassignParams {
    subject_id: i64,
    staff_id: UserId,
}

pub(super) fn try_handle(conn: &Connection, method: &str, call: &Call<'_>) -> Option<HandlerResult> {
    let result = match method {
        "catalog.sections" => handle_sections(conn, call),
        "catalog.schoolYears" => call
            .actor()
            .and_then(|actor_id| items(api::catalog_school_years(conn, actor_id)?)),
        "catalog.createCourse" => handle_create_course(conn, call),
        "catalog.createSection" => handle_create_section(conn, call),
        "catalog.createSchoolYear" => handle_create_school_year(conn, call),
        "catalog.createSubject" => handle_create_subject(conn, call),
        "catalog.reassignSubject" => handle_reassign(conn, call),
        _ => return None,
    };
    Some(result)
}

fn handle_sections(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: SectionsParams = call.params()?;
    items(api::catalog_sections(conn, actor_id, p.course_id)?)
}

fn handle_create_course(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: CreateCourseParams = call.params()?;
    to_result(api::catalog_create_course(conn, actor_id, &p.course_name)?)
}

fn handle_create_section(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: CreateSectionParams = call.params()?;
    to_result(api::catalog_create_section(
        conn,
        actor_id,
        p.course_id,
        &p.section_name,
    )?)
}

fn handle_create_school_year(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: CreateSchoolYearParams = call.params()?;
    to_result(api::catalog_create_school_year(conn, actor_id, p.start, p.end)?)
}

fn handle_create_subject(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: CreateSubjectParams = call.params()?;
    to_result(api::catalog_create_subject(
        conn,
        actor_id,
        &p.subject_name,
        p.staff_id,
        p.course_id,
    )?)
}

fn handle_reassign(conn: &Connection, call: &Call<'_>) -> HandlerResult {
    let actor_id = call.actor()?;
    let p: ReassignParams = call.params()?;
    to_result(api::catalog_reassign_subject(
        conn,
        actor_id,
        p.subject_id,
        p.staff_id,
    )?)
}
