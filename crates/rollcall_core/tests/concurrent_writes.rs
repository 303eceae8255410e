mod common;

use common::{attendance, count_rows, date, seed_school, student};
use rollcall_core::db::open_db;
use rollcall_core::{NewAttendanceSession, PresenceEntry};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

const WRITERS: usize = 8;

fn run_together<T, F>(workers: usize, db_path: &Path, work: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(&rusqlite::Connection, usize) -> T + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(workers));
    let work = Arc::new(work);
    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let barrier = Arc::clone(&barrier);
            let work = Arc::clone(&work);
            let path: PathBuf = db_path.to_path_buf();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                barrier.wait();
                work(&conn, worker)
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect()
}

#[test]
fn racing_submissions_for_the_same_day_create_one_session() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rollcall.sqlite3");
    let conn = open_db(&db_path).unwrap();
    let school = seed_school(&conn);
    let a = student(&conn, &school, "Ana", "Abad", &school.section, &[school.subject.id]);
    let request = NewAttendanceSession {
        subject_id: school.subject.id,
        section_id: school.section.id,
        school_year_id: school.year.id,
        session_date: date(2024, 3, 1),
        present_student_ids: vec![a],
    };
    let staff_id = school.staff.id;

    let outcomes = run_together(WRITERS, &db_path, move |conn, _| {
        attendance(conn)
            .create_attendance(staff_id, &request)
            .map(|session| session.id)
            .map_err(|err| err.code())
    });

    let created = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let duplicates = outcomes
        .iter()
        .filter(|outcome| **outcome == Err("duplicate"))
        .count();
    assert_eq!(created, 1);
    assert_eq!(duplicates, WRITERS - 1);
    assert_eq!(count_rows(&conn, "attendance_sessions"), 1);
    assert_eq!(count_rows(&conn, "presence_records"), 1);
}

#[test]
fn racing_corrections_apply_each_change_once() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rollcall.sqlite3");
    let conn = open_db(&db_path).unwrap();
    let school = seed_school(&conn);
    let subject = school.subject.id;
    let a = student(&conn, &school, "Ana", "Abad", &school.section, &[subject]);
    let b = student(&conn, &school, "Ben", "Bautista", &school.section, &[subject]);
    let session = attendance(&conn)
        .create_attendance(
            school.staff.id,
            &NewAttendanceSession {
                subject_id: subject,
                section_id: school.section.id,
                school_year_id: school.year.id,
                session_date: date(2024, 3, 1),
                present_student_ids: vec![a],
            },
        )
        .unwrap();
    let staff_id = school.staff.id;
    let session_id = session.id;

    let deltas = run_together(2, &db_path, move |conn, _| {
        attendance(conn)
            .reconcile(
                staff_id,
                session_id,
                &[
                    PresenceEntry {
                        student_id: b,
                        present: true,
                    },
                    PresenceEntry {
                        student_id: a,
                        present: false,
                    },
                ],
            )
            .unwrap()
    });

    let added: Vec<i64> = deltas.iter().flat_map(|d| d.added.clone()).collect();
    let removed: Vec<i64> = deltas.iter().flat_map(|d| d.removed.clone()).collect();
    assert_eq!(added, vec![b]);
    assert_eq!(removed, vec![a]);
    assert_eq!(deltas.iter().filter(|d| d.is_empty()).count(), 1);
    assert_eq!(count_rows(&conn, "presence_records"), 1);
}
