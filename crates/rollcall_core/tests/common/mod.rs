#![allow(dead_code)]

use chrono::NaiveDate;
use rollcall_core::model::catalog::{
    Course, NewStudent, SchoolYear, Section, StudentStatus, Subject, SubjectId, YearLevel,
};
use rollcall_core::{
    Account, AttendanceService, CatalogService, NewAccount, Role, SqliteAttendanceRepository,
    SqliteCatalogRepository, UserId,
};
use rusqlite::Connection;

pub type Attendance<'c> =
    AttendanceService<SqliteCatalogRepository<'c>, SqliteAttendanceRepository<'c>>;

/// One course with two sections, one school year and one subject owned by
/// `staff`. `other_staff` owns nothing.
pub struct School {
    pub staff: Account,
    pub other_staff: Account,
    pub admin: Account,
    pub course: Course,
    pub section: Section,
    pub other_section: Section,
    pub year: SchoolYear,
    pub subject: Subject,
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn catalog(conn: &Connection) -> CatalogService<SqliteCatalogRepository<'_>> {
    CatalogService::new(SqliteCatalogRepository::try_new(conn).unwrap())
}

pub fn attendance(conn: &Connection) -> Attendance<'_> {
    AttendanceService::new(
        SqliteCatalogRepository::try_new(conn).unwrap(),
        SqliteAttendanceRepository::try_new(conn).unwrap(),
    )
}

pub fn account(conn: &Connection, email: &str, first: &str, last: &str, role: Role) -> Account {
    catalog(conn)
        .register_account(NewAccount {
            email: email.to_string(),
            first_name: first.to_string(),
            middle_initial: "Q".to_string(),
            last_name: last.to_string(),
            role,
        })
        .unwrap()
}

pub fn seed_school(conn: &Connection) -> School {
    let catalog = catalog(conn);
    let staff = account(conn, "tess.reyes@school.edu", "Tess", "Reyes", Role::Staff);
    let other_staff = account(conn, "other@school.edu", "Oscar", "Lim", Role::Staff);
    let admin = account(conn, "admin@school.edu", "Ada", "Santos", Role::Admin);
    let course = catalog.create_course("BS Computer Science").unwrap();
    let section = catalog.create_section(course.id, "CS-1A").unwrap();
    let other_section = catalog.create_section(course.id, "CS-1B").unwrap();
    let year = catalog
        .create_school_year(date(2023, 8, 1), date(2024, 5, 31))
        .unwrap();
    let subject = catalog
        .create_subject("Data Structures", staff.id, course.id)
        .unwrap();

    School {
        staff,
        other_staff,
        admin,
        course,
        section,
        other_section,
        year,
        subject,
    }
}

/// Registers a student in `section` enrolled in `subject_ids`.
pub fn student(
    conn: &Connection,
    school: &School,
    first: &str,
    last: &str,
    section: &Section,
    subject_ids: &[SubjectId],
) -> UserId {
    let email = format!(
        "{}.{}@students.school.edu",
        first.to_lowercase(),
        last.to_lowercase()
    );
    let (account, _) = catalog(conn)
        .register_student(NewStudent {
            account: NewAccount {
                email,
                first_name: first.to_string(),
                middle_initial: "M".to_string(),
                last_name: last.to_string(),
                role: Role::Student,
            },
            course_id: school.course.id,
            section_id: section.id,
            school_year_id: school.year.id,
            year_level: YearLevel::First,
            status: StudentStatus::Regular,
            subject_ids: subject_ids.to_vec(),
        })
        .unwrap();
    account.id
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
