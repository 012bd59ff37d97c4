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

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    session: (&str, &str),
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
        "session": { "userId": session.0, "role": session.1 },
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn student_requests_for_other_students_collapse_to_self() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    // Tanaka asks for Osei's enrollments and grades; gets their own instead.
    let enrollments = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "enrollments.list",
        ("u-tanaka-s", "student"),
        json!({ "studentId": "u-osei-s" }),
    );
    let rows = enrollments
        .get("enrollments")
        .and_then(|v| v.as_array())
        .expect("enrollments");
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .all(|r| r.get("studentId").and_then(|v| v.as_str()) == Some("u-tanaka-s")));

    let grades = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "grades.list",
        ("u-tanaka-s", "student"),
        json!({ "studentId": "u-osei-s" }),
    );
    let rows = grades.get("grades").and_then(|v| v.as_array()).expect("grades");
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .all(|r| r.get("studentId").and_then(|v| v.as_str()) == Some("u-tanaka-s")));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn staff_can_slice_by_course_or_student() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let by_course = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "enrollments.list",
        ("u-reyes-t", "teacher"),
        json!({ "courseId": "c-alg2" }),
    );
    assert_eq!(
        by_course
            .get("enrollments")
            .and_then(|v| v.as_array())
            .expect("enrollments")
            .len(),
        4
    );

    let by_student = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "grades.list",
        ("u-okafor-a", "admin"),
        json!({ "studentId": "u-osei-s" }),
    );
    let rows = by_student
        .get("grades")
        .and_then(|v| v.as_array())
        .expect("grades");
    assert_eq!(rows.len(), 2);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn users_list_filters_by_role() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let all = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "users.list",
        ("u-okafor-a", "admin"),
        json!({}),
    );
    assert_eq!(
        all.get("users").and_then(|v| v.as_array()).expect("users").len(),
        9
    );

    let teachers = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "users.list",
        ("u-okafor-a", "admin"),
        json!({ "role": "teacher" }),
    );
    let rows = teachers.get("users").and_then(|v| v.as_array()).expect("users");
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .all(|u| u.get("role").and_then(|v| v.as_str()) == Some("teacher")));

    drop(stdin);
    let _ = child.wait();
}
