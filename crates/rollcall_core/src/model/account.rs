//! Account model and registration input validation.
//!
//! # Invariants
//! - `email` is unique and stored with a lowercase domain part.
//! - `role` never changes after registration.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

const MIDDLE_INITIAL_MAX_CHARS: usize = 2;

/// Account identifier. Staff and student ids are account ids.
pub type UserId = i64;

/// Account role. Stored as its numeric level (`1|2|3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
    Student,
}

impl Role {
    pub fn level(self) -> i64 {
        match self {
            Self::Admin => 1,
            Self::Staff => 2,
            Self::Student => 3,
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(Self::Admin),
            2 => Some(Self::Staff),
            3 => Some(Self::Student),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Student => "student",
        }
    }
}

/// Persisted account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub middle_initial: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
}

impl Account {
    /// `First M. Last`
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.middle_initial, &self.last_name)
    }

    /// `Last, First M.`, the roster ordering form.
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.middle_initial, &self.last_name)
    }
}

pub(crate) fn full_name(first: &str, middle_initial: &str, last: &str) -> String {
    format!("{first} {middle_initial}. {last}")
}

pub(crate) fn display_name(first: &str, middle_initial: &str, last: &str) -> String {
    format!("{last}, {first} {middle_initial}.")
}

/// Registration input for a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub first_name: String,
    pub middle_initial: String,
    pub last_name: String,
    pub role: Role,
}

impl NewAccount {
    /// Trims every field, normalizes the email, and checks required values.
    pub fn normalized(self) -> Result<Self, AccountValidationError> {
        let email = normalize_email(&self.email);
        let first_name = required("first_name", &self.first_name)?;
        let middle_initial = required("middle_initial", &self.middle_initial)?;
        let last_name = required("last_name", &self.last_name)?;

        if email.is_empty() {
            return Err(AccountValidationError::MissingField("email"));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(AccountValidationError::InvalidEmail(email));
        }
        if middle_initial.chars().count() > MIDDLE_INITIAL_MAX_CHARS {
            return Err(AccountValidationError::MiddleInitialTooLong);
        }

        Ok(Self {
            email,
            first_name,
            middle_initial,
            last_name,
            role: self.role,
        })
    }
}

/// Lowercases the domain part of an email address; the local part is kept.
pub fn normalize_email(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => trimmed.to_string(),
    }
}

fn required(field: &'static str, value: &str) -> Result<String, AccountValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccountValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    MissingField(&'static str),
    InvalidEmail(String),
    MiddleInitialTooLong,
}

impl Display for AccountValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::MiddleInitialTooLong => write!(
                f,
                "middle_initial must be at most {MIDDLE_INITIAL_MAX_CHARS} characters"
            ),
        }
    }
}

impl Error for AccountValidationError {}

#[cfg(test)]
mod tests {
    use super::{normalize_email, AccountValidationError, NewAccount, Role};

    fn input(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            first_name: " Ana ".to_string(),
            middle_initial: "B".to_string(),
            last_name: "Cruz".to_string(),
            role: Role::Staff,
        }
    }

    #[test]
    fn role_levels_roundtrip() {
        for role in [Role::Admin, Role::Staff, Role::Student] {
            assert_eq!(Role::from_level(role.level()), Some(role));
        }
        assert_eq!(Role::from_level(9), None);
    }

    #[test]
    fn normalize_email_lowercases_domain_only() {
        assert_eq!(normalize_email(" Ana.Cruz@School.EDU "), "Ana.Cruz@school.edu");
    }

    #[test]
    fn normalized_trims_names() {
        let account = input("ana@school.edu").normalized().unwrap();
        assert_eq!(account.first_name, "Ana");
    }

    #[test]
    fn normalized_rejects_bad_email_and_blank_fields() {
        assert!(matches!(
            input("not-an-email").normalized(),
            Err(AccountValidationError::InvalidEmail(_))
        ));

        let mut blank = input("ana@school.edu");
        blank.last_name = "  ".to_string();
        assert_eq!(
            blank.normalized(),
            Err(AccountValidationError::MissingField("last_name"))
        );
    }
}
