use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_grades_list(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let effective_student = if session.role == "student" {
        Some(session.user_id.as_str())
    } else {
        student_id
    };

    let mut sql = String::from(
        "SELECT g.id, g.assignment_id, a.title, a.points, a.course_id, c.code,
                g.student_id, s.last_name || ', ' || s.first_name,
                g.score, g.remark, g.graded_at
         FROM grades g
         JOIN assignments a ON a.id = g.assignment_id
         JOIN courses c ON c.id = a.course_id
         JOIN users s ON s.id = g.student_id
         WHERE 1=1",
    );
    let mut params: Vec<&str> = Vec::new();
    if let Some(cid) = course_id {
        sql.push_str(" AND a.course_id = ?");
        params.push(cid);
    }
    if let Some(sid) = effective_student {
        sql.push_str(" AND g.student_id = ?");
        params.push(sid);
    }
    sql.push_str(" ORDER BY c.code, a.sort_order, s.last_name");

    let mut stmt = match state.db.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "assignmentId": r.get::<_, String>(1)?,
                "assignmentTitle": r.get::<_, String>(2)?,
                "outOf": r.get::<_, f64>(3)?,
                "courseId": r.get::<_, String>(4)?,
                "courseCode": r.get::<_, String>(5)?,
                "studentId": r.get::<_, String>(6)?,
                "studentName": r.get::<_, String>(7)?,
                "score": r.get::<_, f64>(8)?,
                "remark": r.get::<_, Option<String>>(9)?,
                "gradedAt": r.get::<_, String>(10)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(grades) => ok(&req.id, json!({ "grades": grades })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_grades_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = req.session.as_ref() else {
        return err(&req.id, "unauthorized", "session required", None);
    };
    let assignment_id = match req.params.get("assignmentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing assignmentId", None),
    };
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    let Some(score) = req.params.get("score").and_then(|v| v.as_f64()) else {
        return err(&req.id, "bad_params", "missing score", None);
    };
    let remark = req
        .params
        .get("remark")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let row: Option<(String, String, f64)> = match state
        .db
        .query_row(
            "SELECT a.course_id, c.teacher_id, a.points
             FROM assignments a
             JOIN courses c ON c.id = a.course_id
             WHERE a.id = ?",
            [&assignment_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((course_id, teacher_id, points)) = row else {
        return err(&req.id, "not_found", "assignment not found", None);
    };
    if session.role != "admin" && teacher_id != session.user_id {
        return err(
            &req.id,
            "forbidden",
            "course belongs to another teacher",
            None,
        );
    }
    if score < 0.0 || score > points {
        return err(
            &req.id,
            "bad_params",
            format!("score must be within 0..={}", points),
            Some(json!({ "outOf": points })),
        );
    }

    let enrolled: Option<i64> = match state
        .db
        .query_row(
            "SELECT 1 FROM enrollments WHERE course_id = ? AND student_id = ?",
            (&course_id, &student_id),
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if enrolled.is_none() {
        return err(
            &req.id,
            "not_found",
            "student not enrolled in this course",
            None,
        );
    }

    // Regrades overwrite: one grade per (assignment, student).
    let graded_at = chrono::Utc::now().format("%Y-%m-%d").to_string();
    if let Err(e) = state.db.execute(
        "INSERT INTO grades(id, assignment_id, student_id, score, remark, graded_at)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(assignment_id, student_id) DO UPDATE SET
           score = excluded.score,
           remark = excluded.remark,
           graded_at = excluded.graded_at",
        (
            Uuid::new_v4().to_string(),
            &assignment_id,
            &student_id,
            score,
            &remark,
            &graded_at,
        ),
    ) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "grades" })),
        );
    }

    ok(
        &req.id,
        json!({
            "assignmentId": assignment_id,
            "studentId": student_id,
            "score": score,
            "outOf": points,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.list" => Some(handle_grades_list(state, req)),
        "grades.set" => Some(handle_grades_set(state, req)),
        _ => None,
    }
}
