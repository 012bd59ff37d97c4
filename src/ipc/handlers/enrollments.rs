use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_enrollments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = req.session.as_ref() else {
        return err(&req.id, "unauthorized", "session required", None);
    };

    let course_id = req.params.get("courseId").and_then(|v| v.as_str());
    let student_id = req.params.get("studentId").and_then(|v| v.as_str());
    if course_id.is_none() && student_id.is_none() {
        return err(
            &req.id,
            "bad_params",
            "missing courseId or studentId",
            None,
        );
    }

    // Students only ever see their own enrollments, whatever they asked for.
    let effective_student = if session.role == "student" {
        Some(session.user_id.as_str())
    } else {
        student_id
    };

    let mut sql = String::from(
        "SELECT e.id, e.course_id, c.code, c.title, e.student_id,
                s.last_name || ', ' || s.first_name, e.enrolled_at
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         JOIN users s ON s.id = e.student_id
         WHERE 1=1",
    );
    let mut params: Vec<&str> = Vec::new();
    if let Some(cid) = course_id {
        sql.push_str(" AND e.course_id = ?");
        params.push(cid);
    }
    if let Some(sid) = effective_student {
        sql.push_str(" AND e.student_id = ?");
        params.push(sid);
    }
    sql.push_str(" ORDER BY c.code, s.last_name, s.first_name");

    let mut stmt = match state.db.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "courseId": r.get::<_, String>(1)?,
                "courseCode": r.get::<_, String>(2)?,
                "courseTitle": r.get::<_, String>(3)?,
                "studentId": r.get::<_, String>(4)?,
                "studentName": r.get::<_, String>(5)?,
                "enrolledAt": r.get::<_, String>(6)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(enrollments) => ok(&req.id, json!({ "enrollments": enrollments })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "enrollments.list" => Some(handle_enrollments_list(state, req)),
        _ => None,
    }
}
