//! School catalog read models: courses, sections, school years, subjects,
//! student profiles and enrollments.
//!
//! The catalog is owned by administration; the attendance core only reads
//! it, apart from the seeding/registration paths in `CatalogService`.

use crate::model::account::{NewAccount, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type CourseId = i64;
pub type SectionId = i64;
pub type SchoolYearId = i64;
pub type SubjectId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub course_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub section_name: String,
    pub course_id: CourseId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolYear {
    pub id: SchoolYearId,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SchoolYear {
    /// `2023 - 2024`
    pub fn label(&self) -> String {
        format!("{} - {}", self.start.format("%Y"), self.end.format("%Y"))
    }
}

/// A subject is taught by exactly one owning staff account at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub subject_name: String,
    pub staff_id: UserId,
    pub course_id: CourseId,
    pub is_offered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearLevel {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    PostGraduate,
}

impl YearLevel {
    pub fn code(self) -> &'static str {
        match self {
            Self::First => "I",
            Self::Second => "II",
            Self::Third => "III",
            Self::Fourth => "IV",
            Self::Fifth => "V",
            Self::PostGraduate => "PG",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "I" => Some(Self::First),
            "II" => Some(Self::Second),
            "III" => Some(Self::Third),
            "IV" => Some(Self::Fourth),
            "V" => Some(Self::Fifth),
            "PG" => Some(Self::PostGraduate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentStatus {
    #[default]
    Regular,
    Irregular,
    Graduate,
}

impl StudentStatus {
    pub fn code(self) -> &'static str {
        match self {
            Self::Regular => "R",
            Self::Irregular => "I",
            Self::Graduate => "G",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "R" => Some(Self::Regular),
            "I" => Some(Self::Irregular),
            "G" => Some(Self::Graduate),
            _ => None,
        }
    }
}

/// Student-specific data attached to a student account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub section_id: SectionId,
    pub school_year_id: SchoolYearId,
    pub year_level: YearLevel,
    pub status: StudentStatus,
}

/// Registration input for a student: account, profile and subject load.
///
/// One enrollment is created per entry in `subject_ids`, all for
/// `school_year_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub account: NewAccount,
    pub course_id: CourseId,
    pub section_id: SectionId,
    pub school_year_id: SchoolYearId,
    pub year_level: YearLevel,
    pub status: StudentStatus,
    pub subject_ids: Vec<SubjectId>,
}

#[cfg(test)]
mod tests {
    use super::{SchoolYear, StudentStatus, YearLevel};
    use chrono::NaiveDate;

    #[test]
    fn school_year_label_uses_calendar_years() {
        let year = SchoolYear {
            id: 1,
            start: NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        };
        assert_eq!(year.label(), "2023 - 2024");
    }

    #[test]
    fn level_and_status_codes_parse_back() {
        for level in [YearLevel::First, YearLevel::Fourth, YearLevel::PostGraduate] {
            assert_eq!(YearLevel::parse(level.code()), Some(level));
        }
        assert_eq!(StudentStatus::parse("G"), Some(StudentStatus::Graduate));
        assert_eq!(StudentStatus::parse("x"), None);
    }
}
