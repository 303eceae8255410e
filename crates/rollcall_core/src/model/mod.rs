//! Domain model for accounts, the school catalog, attendance, and the
//! leave/feedback workflows.
//!
//! # Invariants
//! - Every persisted entity is identified by an opaque integer key.
//! - Attendance presence is encoded by record existence, never a flag.

pub mod account;
pub mod attendance;
pub mod catalog;
pub mod feedback;
pub mod leave;
