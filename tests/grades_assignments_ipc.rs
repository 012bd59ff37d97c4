use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_daemon() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_classhubd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn classhubd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    session: Option<(&str, &str)>,
    params: serde_json::Value,
) -> serde_json::Value {
    let mut payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    if let Some((user_id, role)) = session {
        payload["session"] = json!({ "userId": user_id, "role": role });
    }
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    session: Option<(&str, &str)>,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, session, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
}

const TEACHER: Option<(&str, &str)> = Some(("u-reyes-t", "teacher"));

#[test]
fn assignments_list_and_create() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "assignments.list",
        TEACHER,
        json!({ "courseId": "c-alg2" }),
    );
    let assignments = listed
        .get("assignments")
        .and_then(|v| v.as_array())
        .expect("assignments");
    assert_eq!(assignments.len(), 2);
    assert_eq!(
        assignments[0].get("title").and_then(|v| v.as_str()),
        Some("Quadratic functions worksheet")
    );
    assert_eq!(assignments[0].get("gradedCount"), Some(&json!(3)));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "assignments.create",
        TEACHER,
        json!({
            "courseId": "c-alg2",
            "title": "Completing the square practice",
            "dueDate": "2025-09-26",
            "points": 25.0
        }),
    );
    assert_eq!(created.get("sortOrder"), Some(&json!(2)));

    // The other teacher cannot post into this course.
    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "assignments.create",
        Some(("u-lindqvist-t", "teacher")),
        json!({ "courseId": "c-alg2", "title": "Nope", "points": 10.0 }),
    );
    assert_eq!(error_code(&resp), "forbidden");

    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.create",
        TEACHER,
        json!({ "courseId": "c-alg2", "title": "Zero pointer", "points": 0.0 }),
    );
    assert_eq!(error_code(&resp), "bad_params");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn grades_upsert_overwrites_previous_score() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    // Haddad has no grade yet on the first worksheet.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grades.set",
        TEACHER,
        json!({
            "assignmentId": "a-alg2-01",
            "studentId": "u-haddad-s",
            "score": 12.0
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "grades.set",
        TEACHER,
        json!({
            "assignmentId": "a-alg2-01",
            "studentId": "u-haddad-s",
            "score": 16.5,
            "remark": "regrade after the appeal"
        }),
    );

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.list",
        TEACHER,
        json!({ "courseId": "c-alg2", "studentId": "u-haddad-s" }),
    );
    let grades = listed
        .get("grades")
        .and_then(|v| v.as_array())
        .expect("grades");
    assert_eq!(grades.len(), 1, "upsert must not duplicate");
    assert_eq!(grades[0].get("score"), Some(&json!(16.5)));
    assert_eq!(
        grades[0].get("remark").and_then(|v| v.as_str()),
        Some("regrade after the appeal")
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn grades_set_validates_range_and_enrollment() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "grades.set",
        TEACHER,
        json!({
            "assignmentId": "a-alg2-01",
            "studentId": "u-tanaka-s",
            "score": 21.0
        }),
    );
    assert_eq!(error_code(&resp), "bad_params", "over the out-of");

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "grades.set",
        TEACHER,
        json!({
            "assignmentId": "a-alg2-01",
            "studentId": "u-gupta-s",
            "score": 10.0
        }),
    );
    assert_eq!(error_code(&resp), "not_found", "not enrolled");

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "grades.set",
        Some(("u-lindqvist-t", "teacher")),
        json!({
            "assignmentId": "a-alg2-01",
            "studentId": "u-tanaka-s",
            "score": 10.0
        }),
    );
    assert_eq!(error_code(&resp), "forbidden", "not their course");

    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "grades.set",
        TEACHER,
        json!({ "assignmentId": "a-alg2-01", "studentId": "u-tanaka-s" }),
    );
    assert_eq!(error_code(&resp), "bad_params", "missing score");

    drop(stdin);
    let _ = child.wait();
}
