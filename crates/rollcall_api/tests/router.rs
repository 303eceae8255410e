use chrono::NaiveDate;
use rollcall_api::handle_line;
use rollcall_core::db::open_db_in_memory;
use rollcall_core::model::catalog::{NewStudent, StudentStatus, YearLevel};
use rollcall_core::{CatalogService, NewAccount, Role, SqliteCatalogRepository, UserId};
use rusqlite::Connection;
use serde_json::{json, Value};

struct Seed {
    admin: UserId,
    staff: UserId,
    subject: i64,
    section: i64,
    course: i64,
    year: i64,
    students: Vec<UserId>,
}

fn new_account(email: &str, last: &str, role: Role) -> NewAccount {
    NewAccount {
        email: email.to_string(),
        first_name: "Sam".to_string(),
        middle_initial: "P".to_string(),
        last_name: last.to_string(),
        role,
    }
}

fn seed(conn: &Connection) -> Seed {
    let catalog = CatalogService::new(SqliteCatalogRepository::try_new(conn).unwrap());
    let admin = catalog
        .register_account(new_account("admin@school.edu", "Admin", Role::Admin))
        .unwrap();
    let staff = catalog
        .register_account(new_account("staff@school.edu", "Staff", Role::Staff))
        .unwrap();
    let course = catalog.create_course("BSIT").unwrap();
    let section = catalog.create_section(course.id, "IT-2B").unwrap();
    let year = catalog
        .create_school_year(
            NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        )
        .unwrap();
    let subject = catalog
        .create_subject("Databases", staff.id, course.id)
        .unwrap();

    let students = ["Abad", "Bautista", "Cruz"]
        .iter()
        .map(|last| {
            let (account, _) = catalog
                .register_student(NewStudent {
                    account: new_account(
                        &format!("{}@students.school.edu", last.to_lowercase()),
                        last,
                        Role::Student,
                    ),
                    course_id: course.id,
                    section_id: section.id,
                    school_year_id: year.id,
                    year_level: YearLevel::Second,
                    status: StudentStatus::Regular,
                    subject_ids: vec![subject.id],
                })
                .unwrap();
            account.id
        })
        .collect();

    Seed {
        admin: admin.id,
        staff: staff.id,
        subject: subject.id,
        section: section.id,
        course: course.id,
        year: year.id,
        students,
    }
}

fn call(conn: &Connection, request: Value) -> Value {
    handle_line(conn, &request.to_string())
}

#[test]
fn health_reports_version_and_echoes_id() {
    let conn = open_db_in_memory().unwrap();
    let reply = call(&conn, json!({"id": "r-1", "method": "health"}));

    assert_eq!(reply["id"], "r-1");
    assert_eq!(reply["ok"], true);
    assert!(reply["result"]["version"].as_str().is_some());
}

#[test]
fn missing_id_gets_a_generated_one() {
    let conn = open_db_in_memory().unwrap();
    let reply = call(&conn, json!({"method": "health"}));

    let id = reply["id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[test]
fn malformed_and_unknown_requests_are_errors() {
    let conn = open_db_in_memory().unwrap();

    let reply = handle_line(&conn, "{not json");
    assert_eq!(reply["ok"], false);
    assert_eq!(reply["error"]["code"], "bad_json");

    let reply = call(&conn, json!({"id": "x", "method": "grades.open", "actorId": 1}));
    assert_eq!(reply["error"]["code"], "not_implemented");

    let reply = call(&conn, json!({"id": "y", "method": "attendance.subjects"}));
    assert_eq!(reply["error"]["code"], "bad_params");
}

#[test]
fn attendance_day_flow_over_json() {
    let conn = open_db_in_memory().unwrap();
    let s = seed(&conn);
    let (a, b, c) = (s.students[0], s.students[1], s.students[2]);

    let roster = call(
        &conn,
        json!({
            "id": "1",
            "method": "attendance.roster",
            "actorId": s.staff,
            "params": {"subjectId": s.subject, "sectionId": s.section, "schoolYearId": s.year}
        }),
    );
    let items = roster["result"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["studentId"], a);
    assert_eq!(items[0]["displayName"], "Abad, Sam P.");

    let create = |present: Vec<UserId>| {
        call(
            &conn,
            json!({
                "id": "2",
                "method": "attendance.create",
                "actorId": s.staff,
                "params": {
                    "subjectId": s.subject,
                    "sectionId": s.section,
                    "schoolYearId": s.year,
                    "date": "2024-03-01",
                    "presentStudentIds": present
                }
            }),
        )
    };
    let created = create(vec![a, c]);
    assert_eq!(created["ok"], true);
    assert_eq!(created["result"]["status"], "created");
    let session_id = created["result"]["sessionId"].as_i64().unwrap();

    let duplicate = create(vec![a]);
    assert_eq!(duplicate["result"]["status"], "duplicate");
    assert!(duplicate["result"].get("sessionId").is_none());

    let reconcile = call(
        &conn,
        json!({
            "id": "3",
            "method": "attendance.reconcile",
            "actorId": s.staff,
            "params": {
                "sessionId": session_id,
                "entries": [
                    {"studentId": b, "present": true},
                    {"studentId": c, "present": false}
                ]
            }
        }),
    );
    assert_eq!(reconcile["result"]["status"], "ok");
    assert_eq!(reconcile["result"]["added"], json!([b]));
    assert_eq!(reconcile["result"]["removed"], json!([c]));

    let state = call(
        &conn,
        json!({
            "id": "4",
            "method": "attendance.rosterState",
            "actorId": s.staff,
            "params": {"sessionId": session_id}
        }),
    );
    let flags: Vec<bool> = state["result"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["isPresent"].as_bool().unwrap())
        .collect();
    assert_eq!(flags, vec![true, true, false]);

    let sessions = call(
        &conn,
        json!({
            "id": "5",
            "method": "attendance.sessions",
            "actorId": s.staff,
            "params": {"subjectId": s.subject, "schoolYearId": s.year}
        }),
    );
    assert_eq!(
        sessions["result"]["items"],
        json!([{"sessionId": session_id, "date": "2024-03-01"}])
    );
}

#[test]
fn writer_errors_are_reported_in_the_status_envelope() {
    let conn = open_db_in_memory().unwrap();
    let s = seed(&conn);

    let reply = call(
        &conn,
        json!({
            "id": "w",
            "method": "attendance.create",
            "actorId": s.staff,
            "params": {
                "subjectId": s.subject,
                "sectionId": s.section,
                "schoolYearId": s.year,
                "date": "2024-03-01",
                "presentStudentIds": [s.students[0], 70_000]
            }
        }),
    );
    assert_eq!(reply["ok"], true);
    assert_eq!(reply["result"]["status"], "error");
    assert_eq!(reply["result"]["errorCode"], "not_found");

    let by_student = call(
        &conn,
        json!({
            "id": "w2",
            "method": "attendance.create",
            "actorId": s.students[0],
            "params": {"subjectId": s.subject, "sectionId": s.section, "schoolYearId": s.year}
        }),
    );
    assert_eq!(by_student["result"]["status"], "error");
    assert_eq!(by_student["result"]["errorCode"], "forbidden");
}

#[test]
fn role_checks_guard_every_method() {
    let conn = open_db_in_memory().unwrap();
    let s = seed(&conn);

    let reply = call(
        &conn,
        json!({"id": "r", "method": "attendance.subjects", "actorId": s.admin}),
    );
    assert_eq!(reply["ok"], false);
    assert_eq!(reply["error"]["code"], "forbidden");

    conn.execute("UPDATE users SET is_active = 0 WHERE id = ?1;", [s.staff])
        .unwrap();
    let reply = call(
        &conn,
        json!({"id": "r2", "method": "attendance.subjects", "actorId": s.staff}),
    );
    assert_eq!(reply["error"]["code"], "forbidden");

    let reply = call(
        &conn,
        json!({"id": "r3", "method": "catalog.schoolYears", "actorId": 12_345}),
    );
    assert_eq!(reply["error"]["code"], "forbidden");
}

#[test]
fn catalog_leave_and_feedback_methods_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let s = seed(&conn);

    let sections = call(
        &conn,
        json!({"id": "c", "method": "catalog.sections", "actorId": s.staff, "params": {"courseId": s.course}}),
    );
    assert_eq!(sections["result"]["items"][0]["sectionName"], "IT-2B");
    let years = call(
        &conn,
        json!({"id": "y", "method": "catalog.schoolYears", "actorId": s.admin}),
    );
    assert_eq!(years["result"]["items"][0]["label"], "2023 - 2024");

    let applied = call(
        &conn,
        json!({"id": "l1", "method": "leave.apply", "actorId": s.staff, "params": {"date": "2024-04-10", "message": "seminar"}}),
    );
    assert_eq!(applied["result"]["status"], "pending");
    let leave_id = applied["result"]["leaveId"].as_i64().unwrap();

    let again = call(
        &conn,
        json!({"id": "l2", "method": "leave.apply", "actorId": s.staff, "params": {"date": "2024-04-10", "message": "seminar"}}),
    );
    assert_eq!(again["error"]["code"], "conflict");

    let pending = call(
        &conn,
        json!({"id": "l3", "method": "leave.pending", "actorId": s.admin}),
    );
    assert_eq!(pending["result"]["items"].as_array().unwrap().len(), 1);

    let decided = call(
        &conn,
        json!({"id": "l4", "method": "leave.decide", "actorId": s.admin, "params": {"leaveId": leave_id, "decision": "approve"}}),
    );
    assert_eq!(decided["result"]["status"], "approved");

    let submitted = call(
        &conn,
        json!({"id": "f1", "method": "feedback.submit", "actorId": s.students[1], "params": {"message": "more lab hours"}}),
    );
    assert_eq!(submitted["result"]["authorRole"], "student");
    let feedback_id = submitted["result"]["feedbackId"].as_i64().unwrap();

    let replied = call(
        &conn,
        json!({"id": "f2", "method": "feedback.reply", "actorId": s.admin, "params": {"feedbackId": feedback_id, "reply": "noted"}}),
    );
    assert_eq!(replied["result"]["reply"], "noted");

    let listed = call(
        &conn,
        json!({"id": "f3", "method": "feedback.list", "actorId": s.admin, "params": {"role": "student"}}),
    );
    assert_eq!(listed["result"]["items"].as_array().unwrap().len(), 1);

    let mine = call(
        &conn,
        json!({"id": "f4", "method": "feedback.mine", "actorId": s.students[1]}),
    );
    assert_eq!(mine["result"]["items"][0]["feedbackId"], feedback_id);
}

fn result_of(reply: &Value) -> &Value {
    assert_eq!(reply["ok"], true, "{reply}");
    &reply["result"]
}

#[test]
fn fresh_database_is_provisioned_over_json() {
    let conn = open_db_in_memory().unwrap();
    let person = |email: &str, last: &str| {
        json!({"email": email, "firstName": "Lea", "middleInitial": "R", "lastName": last})
    };

    let boot = call(
        &conn,
        json!({"id": "b1", "method": "account.bootstrap", "params": person("registrar@school.edu", "Ramos")}),
    );
    let admin = result_of(&boot)["userId"].as_i64().unwrap();
    assert_eq!(boot["result"]["role"], "admin");

    let again = call(
        &conn,
        json!({"id": "b2", "method": "account.bootstrap", "params": person("intruder@school.edu", "Cruz")}),
    );
    assert_eq!(again["error"]["code"], "conflict");

    let mut staff_params = person("lopez@school.edu", "Lopez");
    staff_params["role"] = json!("staff");
    let staff = call(
        &conn,
        json!({"id": "a1", "method": "account.register", "actorId": admin, "params": staff_params}),
    );
    let staff = result_of(&staff)["userId"].as_i64().unwrap();

    let course = call(
        &conn,
        json!({"id": "c1", "method": "catalog.createCourse", "actorId": admin, "params": {"courseName": "BSIT"}}),
    );
    let course = result_of(&course)["courseId"].as_i64().unwrap();
    let section = call(
        &conn,
        json!({"id": "c2", "method": "catalog.createSection", "actorId": admin, "params": {"courseId": course, "sectionName": "IT-1A"}}),
    );
    let section = result_of(&section)["sectionId"].as_i64().unwrap();
    let year = call(
        &conn,
        json!({"id": "c3", "method": "catalog.createSchoolYear", "actorId": admin, "params": {"start": "2023-08-01", "end": "2024-05-31"}}),
    );
    assert_eq!(result_of(&year)["label"], "2023 - 2024");
    let year = year["result"]["schoolYearId"].as_i64().unwrap();
    let subject = call(
        &conn,
        json!({"id": "c4", "method": "catalog.createSubject", "actorId": admin, "params": {"subjectName": "Networks", "staffId": staff, "courseId": course}}),
    );
    let subject = result_of(&subject)["subjectId"].as_i64().unwrap();

    let mut student_params = person("lea.santos@students.school.edu", "Santos");
    student_params["courseId"] = json!(course);
    student_params["sectionId"] = json!(section);
    student_params["schoolYearId"] = json!(year);
    student_params["yearLevel"] = json!("I");
    student_params["subjectIds"] = json!([subject]);
    let enrolled = call(
        &conn,
        json!({"id": "s1", "method": "student.register", "actorId": admin, "params": student_params}),
    );
    assert_eq!(result_of(&enrolled)["account"]["role"], "student");
    assert_eq!(enrolled["result"]["status"], "R");
    let pupil = enrolled["result"]["account"]["userId"].as_i64().unwrap();

    let roster = call(
        &conn,
        json!({
            "id": "r1",
            "method": "attendance.roster",
            "actorId": staff,
            "params": {"subjectId": subject, "sectionId": section, "schoolYearId": year}
        }),
    );
    assert_eq!(result_of(&roster)["items"][0]["studentId"], pupil);

    let mut successor_params = person("tan@school.edu", "Tan");
    successor_params["role"] = json!("staff");
    let successor = call(
        &conn,
        json!({"id": "a2", "method": "account.register", "actorId": admin, "params": successor_params}),
    );
    let successor = result_of(&successor)["userId"].as_i64().unwrap();
    let moved = call(
        &conn,
        json!({"id": "c5", "method": "catalog.reassignSubject", "actorId": admin, "params": {"subjectId": subject, "staffId": successor}}),
    );
    assert_eq!(result_of(&moved)["subjectId"], subject);
    let subjects = call(
        &conn,
        json!({"id": "r2", "method": "attendance.subjects", "actorId": successor}),
    );
    assert_eq!(result_of(&subjects)["items"][0]["subjectName"], "Networks");

    let deactivated = call(
        &conn,
        json!({"id": "a3", "method": "account.setActive", "actorId": admin, "params": {"userId": staff, "isActive": false}}),
    );
    assert_eq!(result_of(&deactivated)["isActive"], false);
    let locked_out = call(
        &conn,
        json!({"id": "r3", "method": "attendance.subjects", "actorId": staff}),
    );
    assert_eq!(locked_out["error"]["code"], "forbidden");
}

#[test]
fn administration_methods_require_an_admin() {
    let conn = open_db_in_memory().unwrap();
    let s = seed(&conn);

    for (method, params) in [
        ("catalog.createCourse", json!({"courseName": "BSCS"})),
        ("catalog.reassignSubject", json!({"subjectId": s.subject, "staffId": s.staff})),
        ("account.setActive", json!({"userId": s.students[0], "isActive": false})),
    ] {
        let reply = call(
            &conn,
            json!({"id": "x", "method": method, "actorId": s.staff, "params": params}),
        );
        assert_eq!(reply["error"]["code"], "forbidden", "{method}");
    }

    let reply = call(
        &conn,
        json!({
            "id": "y",
            "method": "student.register",
            "actorId": s.admin,
            "params": {
                "email": "new@students.school.edu",
                "firstName": "Nia",
                "middleInitial": "O",
                "lastName": "Reyes",
                "courseId": s.course,
                "sectionId": s.section,
                "schoolYearId": s.year,
                "yearLevel": "VII"
            }
        }),
    );
    assert_eq!(reply["error"]["code"], "bad_params");

    let reply = call(
        &conn,
        json!({"id": "z", "method": "account.setActive", "actorId": s.admin, "params": {"userId": s.admin, "isActive": false}}),
    );
    assert_eq!(reply["error"]["code"], "validation");
}

#[test]
fn attendance_dates_outside_the_school_year_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let s = seed(&conn);

    for date in ["2022-12-01", "2099-01-15"] {
        let reply = call(
            &conn,
            json!({
                "id": "d",
                "method": "attendance.create",
                "actorId": s.staff,
                "params": {
                    "subjectId": s.subject,
                    "sectionId": s.section,
                    "schoolYearId": s.year,
                    "date": date,
                    "presentStudentIds": []
                }
            }),
        );
        assert_eq!(reply["result"]["status"], "error", "{date}");
        assert_eq!(reply["result"]["errorCode"], "validation", "{date}");
    }
}
