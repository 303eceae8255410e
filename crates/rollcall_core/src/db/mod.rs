//! Attendance store: connection setup and schema versioning.
//!
//! # Invariants
//! - `PRAGMA user_version` holds the applied schema version.
//! - Repositories refuse connections whose schema is not current.
//! - Lock contention that outlives the busy timeout is reported as
//!   `DbError::Busy`, separate from other SQLite failures.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Another writer held the database lock past the busy timeout.
    Busy(rusqlite::Error),
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
}

impl DbError {
    /// Log code; the request boundary reports all of these as `storage`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Busy(_) => "db_busy",
            Self::Sqlite(_) => "db_error",
            Self::SchemaTooNew { .. } => "db_schema_too_new",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy(err) => write!(f, "attendance store is busy: {err}"),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "attendance store uses schema {found}; this build supports up to {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Busy(err) | Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => Self::Busy(value),
            _ => Self::Sqlite(value),
        }
    }
}
