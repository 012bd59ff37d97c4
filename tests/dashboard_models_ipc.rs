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
fn student_dashboard_counts_open_work() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "dashboard.open",
        ("u-tanaka-s", "student"),
        json!({}),
    );
    assert_eq!(result.get("role"), Some(&json!("student")));
    let cards = result.get("cards").expect("cards");
    // Tanaka: two courses; three assignments across them, two already graded.
    assert_eq!(cards.get("enrolledCourses"), Some(&json!(2)));
    assert_eq!(cards.get("openAssignments"), Some(&json!(1)));
    assert_eq!(cards.get("gradedAssignments"), Some(&json!(2)));
    assert_eq!(cards.get("unreadMessages"), Some(&json!(0)));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn teacher_dashboard_counts_roster_and_marking_backlog() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "dashboard.open",
        ("u-reyes-t", "teacher"),
        json!({}),
    );
    let cards = result.get("cards").expect("cards");
    assert_eq!(cards.get("taughtCourses"), Some(&json!(2)));
    // Distinct students across Algebra II and World History.
    assert_eq!(cards.get("students"), Some(&json!(5)));
    // Ungraded (enrollment, assignment) pairs: 1 + 4 + 2.
    assert_eq!(cards.get("ungradedSubmissions"), Some(&json!(7)));
    assert_eq!(cards.get("unreadMessages"), Some(&json!(1)));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn admin_dashboard_counts_the_school() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "dashboard.open",
        ("u-okafor-a", "admin"),
        json!({}),
    );
    let cards = result.get("cards").expect("cards");
    assert_eq!(cards.get("users"), Some(&json!(9)));
    assert_eq!(cards.get("courses"), Some(&json!(4)));
    assert_eq!(cards.get("frozenCourses"), Some(&json!(0)));
    assert_eq!(cards.get("announcements"), Some(&json!(2)));

    drop(stdin);
    let _ = child.wait();
}
