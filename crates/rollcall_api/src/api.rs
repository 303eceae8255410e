//! Use-case API over one SQLite connection.
//!
//! # Responsibility
//! - Resolve the acting account and authorize it once per call.
//! - Build services over the caller's connection and run one use-case.
//! - Convert domain results into serializable views and status envelopes.
//!
//! # Invariants
//! - Functions never panic; every failure becomes an `ApiError` or an
//!   envelope with `status = error`.
//! - Attendance writes answer with a `created | duplicate | error` status,
//!   never with a bare error.

use chrono::NaiveDate;
use log::warn;
use rollcall_core::db::DbError;
use rollcall_core::model::catalog::{
    Course, NewStudent, SchoolYear, Section, StudentProfile, Subject,
};
use rollcall_core::model::feedback::Feedback;
use rollcall_core::model::leave::{LeaveDecision, LeaveRequest};
use rollcall_core::{
    authorize, authorize_any, Account, Actor, AttendanceError, AttendanceService, AuthzError,
    CatalogRepository, CatalogService, FeedbackError, FeedbackService, LeaveError, LeaveService,
    NewAccount, NewAttendanceSession, PresenceEntry, RegistrationError, RepoError, Role,
    SqliteAttendanceRepository, SqliteCatalogRepository, SqliteFeedbackRepository,
    SqliteLeaveRepository, UserId,
};
use rusqlite::Connection;
use serde::Serialize;
use std::fmt::{Display, Formatter};

type Attendance<'c> =
    AttendanceService<SqliteCatalogRepository<'c>, SqliteAttendanceRepository<'c>>;

/// Boundary error: a stable code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        Self::new("forbidden", value.to_string())
    }
}

impl From<AttendanceError> for ApiError {
    fn from(value: AttendanceError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

impl From<LeaveError> for ApiError {
    fn from(value: LeaveError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

impl From<FeedbackError> for ApiError {
    fn from(value: FeedbackError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

impl From<RegistrationError> for ApiError {
    fn from(value: RegistrationError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { .. } => Self::new("not_found", value.to_string()),
            RepoError::Conflict(_) => Self::new("conflict", value.to_string()),
            other => Self::new("storage", other.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(value: DbError) -> Self {
        Self::new("storage", value.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountItem {
    pub user_id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: &'static str,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentItem {
    pub account: AccountItem,
    pub course_id: i64,
    pub section_id: i64,
    pub school_year_id: i64,
    pub year_level: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseItem {
    pub course_id: i64,
    pub course_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterItem {
    pub student_id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStateItem {
    pub student_id: UserId,
    pub full_name: String,
    pub is_present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    pub session_id: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectItem {
    pub subject_id: i64,
    pub subject_name: String,
    pub course_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionItem {
    pub section_id: i64,
    pub section_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolYearItem {
    pub school_year_id: i64,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveItem {
    pub leave_id: i64,
    pub staff_id: UserId,
    pub date: NaiveDate,
    pub message: String,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    pub feedback_id: i64,
    pub author_id: UserId,
    pub author_role: &'static str,
    pub message: String,
    pub reply: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateStatus {
    Created,
    Duplicate,
    Error,
}

/// Attendance writer envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceCreateResponse {
    pub status: CreateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    Ok,
    Error,
}

/// Attendance reconciler envelope with the applied delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReconcileResponse {
    pub status: ReconcileStatus,
    pub added: Vec<UserId>,
    pub removed: Vec<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    pub message: String,
}

/// Writer input as received at the boundary. `date` defaults to today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceCreateInput {
    pub subject_id: i64,
    pub section_id: i64,
    pub school_year_id: i64,
    pub date: Option<NaiveDate>,
    pub present_student_ids: Vec<UserId>,
}

/// Loads the acting account and checks it holds one of `roles`.
pub fn authorize_actor(conn: &Connection, actor_id: UserId, roles: &[Role]) -> ApiResult<Actor> {
    let account = SqliteCatalogRepository::try_new(conn)?
        .get_account(actor_id)?
        .ok_or_else(|| ApiError::new("forbidden", format!("unknown account {actor_id}")))?;
    let actor = Actor::from(&account);
    let decision = match roles {
        [single] => authorize(&actor, *single),
        many => authorize_any(&actor, many),
    };
    decision.map_err(|err| {
        warn!(
            "event=authz_denied module=api status=error actor_id={actor_id} role={} error_code=forbidden",
            actor.role.as_str()
        );
        ApiError::from(err)
    })?;
    Ok(actor)
}

fn attendance_service(conn: &Connection) -> ApiResult<Attendance<'_>> {
    Ok(AttendanceService::new(
        SqliteCatalogRepository::try_new(conn)?,
        SqliteAttendanceRepository::try_new(conn)?,
    ))
}

fn catalog_service(conn: &Connection) -> ApiResult<CatalogService<SqliteCatalogRepository<'_>>> {
    Ok(CatalogService::new(SqliteCatalogRepository::try_new(conn)?))
}

fn leave_service(conn: &Connection) -> ApiResult<LeaveService<SqliteLeaveRepository<'_>>> {
    Ok(LeaveService::new(SqliteLeaveRepository::try_new(conn)?))
}

fn feedback_service(conn: &Connection) -> ApiResult<FeedbackService<SqliteFeedbackRepository<'_>>> {
    Ok(FeedbackService::new(SqliteFeedbackRepository::try_new(conn)?))
}

pub fn attendance_roster(
    conn: &Connection,
    actor_id: UserId,
    subject_id: i64,
    section_id: i64,
    school_year_id: i64,
) -> ApiResult<Vec<RosterItem>> {
    let actor = authorize_actor(conn, actor_id, &[Role::Staff])?;
    let roster =
        attendance_service(conn)?.roster(actor.user_id, subject_id, section_id, school_year_id)?;
    Ok(roster
        .into_iter()
        .map(|entry| RosterItem {
            student_id: entry.student_id,
            display_name: entry.display_name,
        })
        .collect())
}

/// Records attendance for one class meeting.
pub fn attendance_create(
    conn: &Connection,
    actor_id: UserId,
    input: AttendanceCreateInput,
) -> AttendanceCreateResponse {
    let session_date = input
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let request = NewAttendanceSession {
        subject_id: input.subject_id,
        section_id: input.section_id,
        school_year_id: input.school_year_id,
        session_date,
        present_student_ids: input.present_student_ids,
    };

    let outcome = authorize_actor(conn, actor_id, &[Role::Staff]).and_then(|actor| {
        attendance_service(conn)?
            .create_attendance(actor.user_id, &request)
            .map_err(|err| match err {
                AttendanceError::Duplicate { .. } => ApiError::new("duplicate", err.to_string()),
                other => other.into(),
            })
    });

    match outcome {
        Ok(session) => AttendanceCreateResponse {
            status: CreateStatus::Created,
            session_id: Some(session.id),
            error_code: None,
            message: format!("Attendance recorded for {}.", session.session_date),
        },
        Err(err) if err.code == "duplicate" => AttendanceCreateResponse {
            status: CreateStatus::Duplicate,
            session_id: None,
            error_code: Some(err.code),
            message: err.message,
        },
        Err(err) => AttendanceCreateResponse {
            status: CreateStatus::Error,
            session_id: None,
            error_code: Some(err.code),
            message: err.message,
        },
    }
}

/// Applies presence corrections to a recorded session.
pub fn attendance_reconcile(
    conn: &Connection,
    actor_id: UserId,
    session_id: i64,
    entries: &[PresenceEntry],
) -> AttendanceReconcileResponse {
    let outcome = authorize_actor(conn, actor_id, &[Role::Staff]).and_then(|actor| {
        Ok(attendance_service(conn)?.reconcile(actor.user_id, session_id, entries)?)
    });

    match outcome {
        Ok(delta) => AttendanceReconcileResponse {
            status: ReconcileStatus::Ok,
            message: if delta.is_empty() {
                "No changes.".to_string()
            } else {
                format!(
                    "Marked {} present, {} absent.",
                    delta.added.len(),
                    delta.removed.len()
                )
            },
            added: delta.added,
            removed: delta.removed,
            error_code: None,
        },
        Err(err) => AttendanceReconcileResponse {
            status: ReconcileStatus::Error,
            added: Vec::new(),
            removed: Vec::new(),
            error_code: Some(err.code),
            message: err.message,
        },
    }
}

pub fn attendance_roster_state(
    conn: &Connection,
    actor_id: UserId,
    session_id: i64,
) -> ApiResult<Vec<RosterStateItem>> {
    let actor = authorize_actor(conn, actor_id, &[Role::Staff])?;
    let state = attendance_service(conn)?.roster_state(actor.user_id, session_id)?;
    Ok(state
        .into_iter()
        .map(|entry| RosterStateItem {
            student_id: entry.student_id,
            full_name: entry.full_name,
            is_present: entry.is_present,
        })
        .collect())
}

pub fn attendance_sessions(
    conn: &Connection,
    actor_id: UserId,
    subject_id: i64,
    school_year_id: i64,
) -> ApiResult<Vec<SessionItem>> {
    let actor = authorize_actor(conn, actor_id, &[Role::Staff])?;
    let sessions =
        attendance_service(conn)?.list_sessions(actor.user_id, subject_id, school_year_id)?;
    Ok(sessions
        .into_iter()
        .map(|session| SessionItem {
            session_id: session.id,
            date: session.session_date,
        })
        .collect())
}

pub fn attendance_subjects(conn: &Connection, actor_id: UserId) -> ApiResult<Vec<SubjectItem>> {
    let actor = authorize_actor(conn, actor_id, &[Role::Staff])?;
    let subjects = attendance_service(conn)?.list_staff_subjects(actor.user_id)?;
    Ok(subjects.into_iter().map(subject_item).collect())
}

pub fn catalog_sections(
    conn: &Connection,
    actor_id: UserId,
    course_id: i64,
) -> ApiResult<Vec<SectionItem>> {
    authorize_actor(conn, actor_id, &[Role::Admin, Role::Staff])?;
    let sections = attendance_service(conn)?.list_sections_for_course(course_id)?;
    Ok(sections.into_iter().map(section_item).collect())
}

pub fn catalog_school_years(conn: &Connection, actor_id: UserId) -> ApiResult<Vec<SchoolYearItem>> {
    authorize_actor(conn, actor_id, &[Role::Admin, Role::Staff])?;
    let years = attendance_service(conn)?.list_school_years()?;
    Ok(years.into_iter().map(school_year_item).collect())
}

/// Creates the first administrator. Needs no actor and only succeeds while
/// the database holds no accounts.
pub fn account_bootstrap(conn: &Connection, input: NewAccount) -> ApiResult<AccountItem> {
    let account = catalog_service(conn)?.bootstrap_admin(input)?;
    Ok(account_item(account))
}

pub fn account_register(
    conn: &Connection,
    actor_id: UserId,
    input: NewAccount,
) -> ApiResult<AccountItem> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let account = catalog_service(conn)?.register_account(input)?;
    Ok(account_item(account))
}

pub fn account_set_active(
    conn: &Connection,
    actor_id: UserId,
    user_id: UserId,
    is_active: bool,
) -> ApiResult<AccountItem> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    if user_id == actor_id && !is_active {
        return Err(ApiError::new(
            "validation",
            "administrators cannot deactivate themselves",
        ));
    }
    let account = catalog_service(conn)?.set_account_active(user_id, is_active)?;
    Ok(account_item(account))
}

pub fn student_register(
    conn: &Connection,
    actor_id: UserId,
    input: NewStudent,
) -> ApiResult<StudentItem> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let (account, profile) = catalog_service(conn)?.register_student(input)?;
    Ok(student_item(account, profile))
}

pub fn catalog_create_course(
    conn: &Connection,
    actor_id: UserId,
    course_name: &str,
) -> ApiResult<CourseItem> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let course = catalog_service(conn)?.create_course(course_name)?;
    Ok(course_item(course))
}

pub fn catalog_create_section(
    conn: &Connection,
    actor_id: UserId,
    course_id: i64,
    section_name: &str,
) -> ApiResult<SectionItem> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let section = catalog_service(conn)?.create_section(course_id, section_name)?;
    Ok(section_item(section))
}

pub fn catalog_create_school_year(
    conn: &Connection,
    actor_id: UserId,
    start: NaiveDate,
    end: NaiveDate,
) -> ApiResult<SchoolYearItem> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let year = catalog_service(conn)?.create_school_year(start, end)?;
    Ok(school_year_item(year))
}

pub fn catalog_create_subject(
    conn: &Connection,
    actor_id: UserId,
    subject_name: &str,
    staff_id: UserId,
    course_id: i64,
) -> ApiResult<SubjectItem> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let subject = catalog_service(conn)?.create_subject(subject_name, staff_id, course_id)?;
    Ok(subject_item(subject))
}

/// Moves a subject to another staff member. Recorded sessions keep their
/// original owner.
pub fn catalog_reassign_subject(
    conn: &Connection,
    actor_id: UserId,
    subject_id: i64,
    staff_id: UserId,
) -> ApiResult<SubjectItem> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let subject = catalog_service(conn)?.reassign_subject(subject_id, staff_id)?;
    Ok(subject_item(subject))
}

pub fn leave_apply(
    conn: &Connection,
    actor_id: UserId,
    date: NaiveDate,
    message: &str,
) -> ApiResult<LeaveItem> {
    let actor = authorize_actor(conn, actor_id, &[Role::Staff])?;
    let request = leave_service(conn)?.apply_leave(actor.user_id, date, message)?;
    Ok(leave_item(request))
}

pub fn leave_list(conn: &Connection, actor_id: UserId) -> ApiResult<Vec<LeaveItem>> {
    let actor = authorize_actor(conn, actor_id, &[Role::Staff])?;
    let requests = leave_service(conn)?.list_leave(actor.user_id)?;
    Ok(requests.into_iter().map(leave_item).collect())
}

pub fn leave_pending(conn: &Connection, actor_id: UserId) -> ApiResult<Vec<LeaveItem>> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let requests = leave_service(conn)?.list_pending_leave()?;
    Ok(requests.into_iter().map(leave_item).collect())
}

pub fn leave_decide(
    conn: &Connection,
    actor_id: UserId,
    leave_id: i64,
    decision: LeaveDecision,
) -> ApiResult<LeaveItem> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let request = leave_service(conn)?.decide_leave(leave_id, decision)?;
    Ok(leave_item(request))
}

pub fn feedback_submit(conn: &Connection, actor_id: UserId, message: &str) -> ApiResult<FeedbackItem> {
    let actor = authorize_actor(conn, actor_id, &[Role::Staff, Role::Student])?;
    let feedback = feedback_service(conn)?.submit_feedback(actor.user_id, actor.role, message)?;
    Ok(feedback_item(feedback))
}

pub fn feedback_edit(
    conn: &Connection,
    actor_id: UserId,
    feedback_id: i64,
    message: &str,
) -> ApiResult<FeedbackItem> {
    let actor = authorize_actor(conn, actor_id, &[Role::Staff, Role::Student])?;
    let feedback = feedback_service(conn)?.edit_feedback(actor.user_id, feedback_id, message)?;
    Ok(feedback_item(feedback))
}

pub fn feedback_reply(
    conn: &Connection,
    actor_id: UserId,
    feedback_id: i64,
    reply: &str,
) -> ApiResult<FeedbackItem> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let feedback = feedback_service(conn)?.reply_feedback(feedback_id, reply)?;
    Ok(feedback_item(feedback))
}

pub fn feedback_list(conn: &Connection, actor_id: UserId, role: Role) -> ApiResult<Vec<FeedbackItem>> {
    authorize_actor(conn, actor_id, &[Role::Admin])?;
    let items = feedback_service(conn)?.list_feedback(role)?;
    Ok(items.into_iter().map(feedback_item).collect())
}

pub fn feedback_mine(conn: &Connection, actor_id: UserId) -> ApiResult<Vec<FeedbackItem>> {
    let actor = authorize_actor(conn, actor_id, &[Role::Staff, Role::Student])?;
    let items = feedback_service(conn)?.list_own_feedback(actor.user_id)?;
    Ok(items.into_iter().map(feedback_item).collect())
}

fn account_item(account: Account) -> AccountItem {
    AccountItem {
        user_id: account.id,
        full_name: account.full_name(),
        email: account.email,
        role: account.role.as_str(),
        is_active: account.is_active,
    }
}

fn student_item(account: Account, profile: StudentProfile) -> StudentItem {
    StudentItem {
        account: account_item(account),
        course_id: profile.course_id,
        section_id: profile.section_id,
        school_year_id: profile.school_year_id,
        year_level: profile.year_level.code(),
        status: profile.status.code(),
    }
}

fn course_item(course: Course) -> CourseItem {
    CourseItem {
        course_id: course.id,
        course_name: course.course_name,
    }
}

fn subject_item(subject: Subject) -> SubjectItem {
    SubjectItem {
        subject_id: subject.id,
        subject_name: subject.subject_name,
        course_id: subject.course_id,
    }
}

fn section_item(section: Section) -> SectionItem {
    SectionItem {
        section_id: section.id,
        section_name: section.section_name,
    }
}

fn school_year_item(year: SchoolYear) -> SchoolYearItem {
    SchoolYearItem {
        school_year_id: year.id,
        label: year.label(),
        start: year.start,
        end: year.end,
    }
}

fn leave_item(request: LeaveRequest) -> LeaveItem {
    LeaveItem {
        leave_id: request.id,
        staff_id: request.staff_id,
        date: request.leave_date,
        message: request.message,
        status: request.status.as_str(),
    }
}

fn feedback_item(feedback: Feedback) -> FeedbackItem {
    FeedbackItem {
        feedback_id: feedback.id,
        author_id: feedback.author_id,
        author_role: feedback.author_role.as_str(),
        message: feedback.message,
        reply: feedback.reply,
    }
}
