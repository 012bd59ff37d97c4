use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_assignments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };

    let mut stmt = match state.db.prepare(
        "SELECT a.id, a.title, a.instructions, a.due_date, a.points, a.sort_order,
                (SELECT COUNT(*) FROM grades g WHERE g.assignment_id = a.id)
         FROM assignments a
         WHERE a.course_id = ?
         ORDER BY a.sort_order, a.due_date",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([&course_id], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "title": r.get::<_, String>(1)?,
                "instructions": r.get::<_, String>(2)?,
                "dueDate": r.get::<_, Option<String>>(3)?,
                "points": r.get::<_, f64>(4)?,
                "sortOrder": r.get::<_, i64>(5)?,
                "gradedCount": r.get::<_, i64>(6)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(assignments) => ok(&req.id, json!({ "assignments": assignments })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = req.session.as_ref() else {
        return err(&req.id, "unauthorized", "session required", None);
    };
    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };
    let title = match req.params.get("title").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing title", None),
    };
    if title.is_empty() {
        return err(&req.id, "bad_params", "title must not be empty", None);
    }
    let Some(points) = req.params.get("points").and_then(|v| v.as_f64()) else {
        return err(&req.id, "bad_params", "missing points", None);
    };
    if points <= 0.0 {
        return err(&req.id, "bad_params", "points must be positive", None);
    }
    let due_date = req
        .params
        .get("dueDate")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let instructions = req
        .params
        .get("instructions")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let teacher_id: Option<String> = match state
        .db
        .query_row("SELECT teacher_id FROM courses WHERE id = ?", [&course_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some(teacher_id) = teacher_id else {
        return err(&req.id, "not_found", "course not found", None);
    };
    if session.role != "admin" && teacher_id != session.user_id {
        return err(
            &req.id,
            "forbidden",
            "course belongs to another teacher",
            None,
        );
    }

    let next_sort: i64 = match state.db.query_row(
        "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM assignments WHERE course_id = ?",
        [&course_id],
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let assignment_id = Uuid::new_v4().to_string();
    if let Err(e) = state.db.execute(
        "INSERT INTO assignments(id, course_id, title, instructions, due_date, points, sort_order)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &assignment_id,
            &course_id,
            &title,
            &instructions,
            &due_date,
            points,
            next_sort,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "assignments" })),
        );
    }

    ok(
        &req.id,
        json!({ "assignmentId": assignment_id, "sortOrder": next_sort }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.list" => Some(handle_assignments_list(state, req)),
        "assignments.create" => Some(handle_assignments_create(state, req)),
        _ => None,
    }
}
