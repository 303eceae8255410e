//! Core domain logic for Rollcall, a school attendance backend.
//! This crate owns the storage schema and every business invariant; request
//! boundaries live in `rollcall_api`.

pub mod authz;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use authz::{authorize, authorize_any, Actor, AuthzError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::account::{Account, NewAccount, Role, UserId};
pub use model::attendance::{
    AttendanceSession, NewAttendanceSession, PresenceDelta, PresenceEntry, RosterEntry,
    RosterStateEntry, SessionId,
};
pub use repo::attendance_repo::{AttendanceRepository, SqliteAttendanceRepository};
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::feedback_repo::{FeedbackRepository, SqliteFeedbackRepository};
pub use repo::leave_repo::{LeaveRepository, SqliteLeaveRepository};
pub use repo::{RepoError, RepoResult};
pub use service::attendance_service::{AttendanceError, AttendanceService};
pub use service::catalog_service::{CatalogService, RegistrationError};
pub use service::feedback_service::{FeedbackError, FeedbackService};
pub use service::leave_service::{LeaveError, LeaveService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
