use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn count(conn: &Connection, sql: &str, params: &[&str]) -> rusqlite::Result<i64> {
    conn.query_row(sql, rusqlite::params_from_iter(params.iter()), |r| r.get(0))
}

/// One dashboard for all three roles; the role picks which counters are
/// computed, not which endpoint gets called.
fn handle_dashboard_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = req.session.as_ref() else {
        return err(&req.id, "unauthorized", "session required", None);
    };
    let conn = &state.db;
    let uid = session.user_id.as_str();

    let unread = match count(
        conn,
        "SELECT COUNT(*) FROM messages WHERE recipient_id = ? AND read_flag = 0",
        &[uid],
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let cards = match session.role.as_str() {
        "student" => {
            let enrolled = count(
                conn,
                "SELECT COUNT(*) FROM enrollments WHERE student_id = ?",
                &[uid],
            );
            let due = count(
                conn,
                "SELECT COUNT(*) FROM assignments a
                 JOIN enrollments e ON e.course_id = a.course_id
                 WHERE e.student_id = ?
                   AND a.id NOT IN (SELECT assignment_id FROM grades WHERE student_id = ?)",
                &[uid, uid],
            );
            let graded = count(
                conn,
                "SELECT COUNT(*) FROM grades WHERE student_id = ?",
                &[uid],
            );
            match (enrolled, due, graded) {
                (Ok(enrolled), Ok(due), Ok(graded)) => json!({
                    "enrolledCourses": enrolled,
                    "openAssignments": due,
                    "gradedAssignments": graded,
                    "unreadMessages": unread,
                }),
                (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                    return err(&req.id, "db_query_failed", e.to_string(), None)
                }
            }
        }
        "teacher" => {
            let taught = count(
                conn,
                "SELECT COUNT(*) FROM courses WHERE teacher_id = ?",
                &[uid],
            );
            let students = count(
                conn,
                "SELECT COUNT(DISTINCT e.student_id) FROM enrollments e
                 JOIN courses c ON c.id = e.course_id
                 WHERE c.teacher_id = ?",
                &[uid],
            );
            let ungraded = count(
                conn,
                "SELECT COUNT(*) FROM enrollments e
                 JOIN assignments a ON a.course_id = e.course_id
                 JOIN courses c ON c.id = e.course_id
                 WHERE c.teacher_id = ?
                   AND NOT EXISTS (
                     SELECT 1 FROM grades g
                     WHERE g.assignment_id = a.id AND g.student_id = e.student_id
                   )",
                &[uid],
            );
            match (taught, students, ungraded) {
                (Ok(taught), Ok(students), Ok(ungraded)) => json!({
                    "taughtCourses": taught,
                    "students": students,
                    "ungradedSubmissions": ungraded,
                    "unreadMessages": unread,
                }),
                (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                    return err(&req.id, "db_query_failed", e.to_string(), None)
                }
            }
        }
        "admin" => {
            let users = count(conn, "SELECT COUNT(*) FROM users", &[]);
            let courses = count(conn, "SELECT COUNT(*) FROM courses", &[]);
            let frozen = count(conn, "SELECT COUNT(*) FROM courses WHERE frozen = 1", &[]);
            let announcements = count(conn, "SELECT COUNT(*) FROM announcements", &[]);
            match (users, courses, frozen, announcements) {
                (Ok(users), Ok(courses), Ok(frozen), Ok(announcements)) => json!({
                    "users": users,
                    "courses": courses,
                    "frozenCourses": frozen,
                    "announcements": announcements,
                    "unreadMessages": unread,
                }),
                (Err(e), _, _, _) | (_, Err(e), _, _) | (_, _, Err(e), _) | (_, _, _, Err(e)) => {
                    return err(&req.id, "db_query_failed", e.to_string(), None)
                }
            }
        }
        other => {
            return err(
                &req.id,
                "bad_params",
                format!("unknown role: {}", other),
                None,
            )
        }
    };

    ok(&req.id, json!({ "role": session.role, "cards": cards }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.open" => Some(handle_dashboard_open(state, req)),
        _ => None,
    }
}
