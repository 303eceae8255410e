//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Map storage errors into per-workflow error enums with stable codes.
//!
//! Services assume the caller already passed `authz::authorize`.

pub mod attendance_service;
pub mod catalog_service;
pub mod feedback_service;
pub mod leave_service;
