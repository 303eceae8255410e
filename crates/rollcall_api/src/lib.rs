//! Request boundary for the Rollcall core.
//!
//! - `api`: typed use-case calls that authorize the actor and return views
//!   or status envelopes.
//! - `router`: JSON line protocol (`{id, method, actorId, params}`) on top of
//!   `api`.
//! - `config`: environment configuration for hosts such as the CLI.

pub mod api;
pub mod config;
pub mod router;

pub use config::ApiConfig;
pub use router::{handle_line, handle_request, Request};
