mod common;

use common::{account, catalog, date, seed_school, student};
use rollcall_core::db::open_db_in_memory;
use rollcall_core::model::account::AccountValidationError;
use rollcall_core::model::catalog::{NewStudent, StudentStatus, YearLevel};
use rollcall_core::{NewAccount, RegistrationError, Role};

fn new_student(school: &common::School, email: &str, subject_ids: Vec<i64>) -> NewStudent {
    NewStudent {
        account: NewAccount {
            email: email.to_string(),
            first_name: "Ivy".to_string(),
            middle_initial: "K".to_string(),
            last_name: "Go".to_string(),
            role: Role::Admin,
        },
        course_id: school.course.id,
        section_id: school.section.id,
        school_year_id: school.year.id,
        year_level: YearLevel::Second,
        status: StudentStatus::Irregular,
        subject_ids,
    }
}

#[test]
fn duplicate_email_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    account(&conn, "ana@school.edu", "Ana", "Abad", Role::Staff);

    let err = catalog(&conn)
        .register_account(NewAccount {
            email: " ana@SCHOOL.edu".to_string(),
            first_name: "Other".to_string(),
            middle_initial: "Z".to_string(),
            last_name: "Person".to_string(),
            role: Role::Staff,
        })
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Conflict(_)));
}

#[test]
fn invalid_account_input_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let err = catalog(&conn)
        .register_account(NewAccount {
            email: "nobody".to_string(),
            first_name: "No".to_string(),
            middle_initial: "B".to_string(),
            last_name: "Dy".to_string(),
            role: Role::Student,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::InvalidAccount(AccountValidationError::InvalidEmail(_))
    ));
    assert_eq!(err.code(), "validation");
}

#[test]
fn student_registration_forces_role_and_enrolls_once_per_subject() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let service = catalog(&conn);

    let (account, profile) = service
        .register_student(new_student(
            &school,
            "ivy.go@students.school.edu",
            vec![school.subject.id, school.subject.id],
        ))
        .unwrap();

    assert_eq!(account.role, Role::Student);
    assert_eq!(profile.year_level, YearLevel::Second);
    assert_eq!(service.get_student_profile(account.id).unwrap(), profile);
    assert_eq!(common::count_rows(&conn, "enrollments"), 1);
}

#[test]
fn failed_student_registration_leaves_no_account_behind() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let service = catalog(&conn);
    let other_course = service.create_course("BS Nursing").unwrap();
    let foreign_subject = service
        .create_subject("Anatomy", school.staff.id, other_course.id)
        .unwrap();
    let before = common::count_rows(&conn, "users");

    let err = service
        .register_student(new_student(
            &school,
            "ivy.go@students.school.edu",
            vec![school.subject.id, foreign_subject.id],
        ))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Validation(_)));

    let err = service
        .register_student(new_student(&school, "ivy.go@students.school.edu", vec![404]))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::NotFound {
            entity: "subject",
            id: 404
        }
    ));
    assert_eq!(common::count_rows(&conn, "users"), before);
}

#[test]
fn catalog_seeding_validates_its_inputs() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let service = catalog(&conn);

    assert!(matches!(
        service.create_school_year(date(2024, 5, 31), date(2023, 8, 1)),
        Err(RegistrationError::Validation(_))
    ));
    assert!(matches!(
        service.create_subject("Ethics", school.admin.id, school.course.id),
        Err(RegistrationError::Validation(_))
    ));
    assert!(matches!(
        service.create_section(999, "X"),
        Err(RegistrationError::NotFound { entity: "course", .. })
    ));
    assert!(matches!(
        service.create_course("  "),
        Err(RegistrationError::Validation(_))
    ));

    let pupil = student(&conn, &school, "Ana", "Abad", &school.section, &[]);
    service.set_account_active(school.staff.id, false).unwrap();
    assert!(!service.get_account(school.staff.id).unwrap().is_active);
    assert!(matches!(
        service.reassign_subject(school.subject.id, pupil),
        Err(RegistrationError::Validation(_))
    ));
}

#[test]
fn bootstrap_creates_one_admin_into_an_empty_database_only() {
    let conn = open_db_in_memory().unwrap();
    let service = catalog(&conn);
    let first = NewAccount {
        email: "registrar@school.edu".to_string(),
        first_name: "Rita".to_string(),
        middle_initial: "P".to_string(),
        last_name: "Ocampo".to_string(),
        role: Role::Student,
    };

    let admin = service.bootstrap_admin(first.clone()).unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert!(admin.is_active);

    let err = service
        .bootstrap_admin(NewAccount {
            email: "second@school.edu".to_string(),
            ..first
        })
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Conflict(_)));
    assert_eq!(common::count_rows(&conn, "users"), 1);
}
