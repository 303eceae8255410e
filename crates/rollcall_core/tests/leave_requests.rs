mod common;

use common::{date, seed_school};
use rollcall_core::db::open_db_in_memory;
use rollcall_core::model::leave::{LeaveDecision, LeaveStatus};
use rollcall_core::{LeaveError, LeaveService, SqliteLeaveRepository};

#[test]
fn staff_apply_once_per_day_and_see_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let service = LeaveService::new(SqliteLeaveRepository::try_new(&conn).unwrap());

    let first = service
        .apply_leave(school.staff.id, date(2024, 3, 1), "  medical appointment ")
        .unwrap();
    assert_eq!(first.status, LeaveStatus::Pending);
    assert_eq!(first.message, "medical appointment");
    service
        .apply_leave(school.staff.id, date(2024, 4, 2), "family event")
        .unwrap();

    let err = service
        .apply_leave(school.staff.id, date(2024, 3, 1), "again")
        .unwrap_err();
    assert!(matches!(err, LeaveError::Conflict(_)));

    let dates: Vec<_> = service
        .list_leave(school.staff.id)
        .unwrap()
        .into_iter()
        .map(|request| request.leave_date)
        .collect();
    assert_eq!(dates, vec![date(2024, 4, 2), date(2024, 3, 1)]);
}

#[test]
fn blank_message_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let service = LeaveService::new(SqliteLeaveRepository::try_new(&conn).unwrap());

    let err = service
        .apply_leave(school.staff.id, date(2024, 3, 1), "   ")
        .unwrap_err();
    assert_eq!(err.code(), "validation");
}

#[test]
fn decisions_are_final_and_leave_the_pending_queue() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let service = LeaveService::new(SqliteLeaveRepository::try_new(&conn).unwrap());
    let approved = service
        .apply_leave(school.staff.id, date(2024, 3, 1), "conference")
        .unwrap();
    let waiting = service
        .apply_leave(school.other_staff.id, date(2024, 3, 1), "errand")
        .unwrap();

    let decided = service
        .decide_leave(approved.id, LeaveDecision::Approve)
        .unwrap();
    assert_eq!(decided.status, LeaveStatus::Approved);

    let err = service
        .decide_leave(approved.id, LeaveDecision::Reject)
        .unwrap_err();
    assert!(matches!(err, LeaveError::Conflict(_)));

    let pending: Vec<_> = service
        .list_pending_leave()
        .unwrap()
        .into_iter()
        .map(|request| request.id)
        .collect();
    assert_eq!(pending, vec![waiting.id]);

    assert!(matches!(
        service.decide_leave(999, LeaveDecision::Approve),
        Err(LeaveError::NotFound(999))
    ));
}
