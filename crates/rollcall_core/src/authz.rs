//! Role-based authorization predicate for request boundaries.
//!
//! Every use-case entry point checks the acting account exactly once with
//! [`authorize`]; services below the boundary assume an authorized actor.

use crate::model::account::{Account, Role, UserId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// The account performing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub is_active: bool,
}

impl From<&Account> for Actor {
    fn from(account: &Account) -> Self {
        Self {
            user_id: account.id,
            role: account.role,
            is_active: account.is_active,
        }
    }
}

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    Inactive(UserId),
    WrongRole {
        user_id: UserId,
        required: Role,
        actual: Role,
    },
    RoleNotAllowed {
        user_id: UserId,
        actual: Role,
    },
}

impl Display for AuthzError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive(user_id) => write!(f, "account {user_id} is inactive"),
            Self::WrongRole {
                user_id,
                required,
                actual,
            } => write!(
                f,
                "account {user_id} has role `{}`; `{}` is required",
                actual.as_str(),
                required.as_str()
            ),
            Self::RoleNotAllowed { user_id, actual } => write!(
                f,
                "account {user_id} has role `{}`, which is not allowed here",
                actual.as_str()
            ),
        }
    }
}

impl Error for AuthzError {}

/// Allows `actor` iff it is active and holds exactly `required`.
pub fn authorize(actor: &Actor, required: Role) -> Result<(), AuthzError> {
    if !actor.is_active {
        return Err(AuthzError::Inactive(actor.user_id));
    }
    if actor.role != required {
        return Err(AuthzError::WrongRole {
            user_id: actor.user_id,
            required,
            actual: actor.role,
        });
    }
    Ok(())
}

/// Like [`authorize`], accepting any role in `allowed`. An empty slice
/// denies everyone.
pub fn authorize_any(actor: &Actor, allowed: &[Role]) -> Result<(), AuthzError> {
    if !actor.is_active {
        return Err(AuthzError::Inactive(actor.user_id));
    }
    if !allowed.contains(&actor.role) {
        return Err(AuthzError::RoleNotAllowed {
            user_id: actor.user_id,
            actual: actor.role,
        });
    }
    Ok(())
}
