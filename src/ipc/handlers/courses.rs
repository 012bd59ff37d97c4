use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request, Session};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("missing {}", key),
            details: None,
        })
}

fn require_session<'a>(req: &'a Request) -> Result<&'a Session, HandlerErr> {
    req.session.as_ref().ok_or_else(|| HandlerErr {
        code: "unauthorized",
        message: "session required".to_string(),
        details: None,
    })
}

#[derive(Debug, Clone)]
struct CourseRow {
    id: String,
    code: String,
    title: String,
    subject: String,
    teacher_id: String,
    term: String,
    frozen: bool,
}

fn load_course(conn: &Connection, course_id: &str) -> Result<CourseRow, HandlerErr> {
    conn.query_row(
        "SELECT id, code, title, subject, teacher_id, term, frozen
         FROM courses WHERE id = ?",
        [course_id],
        |r| {
            Ok(CourseRow {
                id: r.get(0)?,
                code: r.get(1)?,
                title: r.get(2)?,
                subject: r.get(3)?,
                teacher_id: r.get(4)?,
                term: r.get(5)?,
                frozen: r.get::<_, i64>(6)? != 0,
            })
        },
    )
    .optional()
    .map_err(|e| HandlerErr {
        code: "db_query_failed",
        message: e.to_string(),
        details: None,
    })?
    .ok_or_else(|| HandlerErr {
        code: "not_found",
        message: "course not found".to_string(),
        details: None,
    })
}

/// Teachers may only manage their own courses; admins manage any.
fn require_manage(course: &CourseRow, session: &Session) -> Result<(), HandlerErr> {
    if session.role == "admin" || course.teacher_id == session.user_id {
        return Ok(());
    }
    Err(HandlerErr {
        code: "forbidden",
        message: "course belongs to another teacher".to_string(),
        details: None,
    })
}

fn courses_list(conn: &Connection, session: &Session) -> Result<serde_json::Value, HandlerErr> {
    // One listing for all three roles; only the WHERE clause differs.
    let base = "SELECT
           c.id, c.code, c.title, c.subject, c.term, c.frozen, c.continued_from,
           c.teacher_id,
           (SELECT t.last_name || ', ' || t.first_name FROM users t WHERE t.id = c.teacher_id),
           (SELECT COUNT(*) FROM enrollments e WHERE e.course_id = c.id)
         FROM courses c";
    let (sql, filter): (String, Option<&str>) = match session.role.as_str() {
        "teacher" => (
            format!("{} WHERE c.teacher_id = ? ORDER BY c.code", base),
            Some(session.user_id.as_str()),
        ),
        "student" => (
            format!(
                "{} JOIN enrollments e ON e.course_id = c.id
                 WHERE e.student_id = ? ORDER BY c.code",
                base
            ),
            Some(session.user_id.as_str()),
        ),
        _ => (format!("{} ORDER BY c.code", base), None),
    };

    let mut stmt = conn.prepare(&sql).map_err(|e| HandlerErr {
        code: "db_query_failed",
        message: e.to_string(),
        details: None,
    })?;
    let map_row = |r: &rusqlite::Row| -> rusqlite::Result<serde_json::Value> {
        Ok(json!({
            "id": r.get::<_, String>(0)?,
            "code": r.get::<_, String>(1)?,
            "title": r.get::<_, String>(2)?,
            "subject": r.get::<_, String>(3)?,
            "term": r.get::<_, String>(4)?,
            "frozen": r.get::<_, i64>(5)? != 0,
            "continuedFrom": r.get::<_, Option<String>>(6)?,
            "teacherId": r.get::<_, String>(7)?,
            "teacherName": r.get::<_, String>(8)?,
            "enrolledCount": r.get::<_, i64>(9)?,
        }))
    };
    let rows = match filter {
        Some(param) => stmt.query_map([param], map_row),
        None => stmt.query_map([], map_row),
    }
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(|e| HandlerErr {
        code: "db_query_failed",
        message: e.to_string(),
        details: None,
    })?;

    Ok(json!({ "courses": rows }))
}

fn courses_set_frozen(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
    frozen: bool,
) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let course = load_course(conn, &course_id)?;
    require_manage(&course, session)?;
    if course.frozen == frozen {
        return Err(HandlerErr {
            code: "conflict",
            message: if frozen {
                "course is already frozen".to_string()
            } else {
                "course is not frozen".to_string()
            },
            details: None,
        });
    }
    conn.execute(
        "UPDATE courses SET frozen = ? WHERE id = ?",
        (frozen as i64, &course_id),
    )
    .map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "courses" })),
    })?;
    Ok(json!({ "courseId": course_id, "frozen": frozen }))
}

fn courses_continue(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let term = get_required_str(params, "term")?;
    let term = term.trim().to_string();
    if term.is_empty() {
        return Err(HandlerErr {
            code: "bad_params",
            message: "term must not be empty".to_string(),
            details: None,
        });
    }
    let course = load_course(conn, &course_id)?;
    require_manage(&course, session)?;
    if term == course.term {
        return Err(HandlerErr {
            code: "bad_params",
            message: "continuation term must differ from the source term".to_string(),
            details: None,
        });
    }

    let already: Option<String> = conn
        .query_row(
            "SELECT id FROM courses WHERE continued_from = ? AND term = ?",
            (&course_id, &term),
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?;
    if let Some(existing) = already {
        return Err(HandlerErr {
            code: "conflict",
            message: "course was already continued into that term".to_string(),
            details: Some(json!({ "courseId": existing })),
        });
    }

    let new_id = Uuid::new_v4().to_string();
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();

    let tx = conn.unchecked_transaction().map_err(|e| HandlerErr {
        code: "db_tx_failed",
        message: e.to_string(),
        details: None,
    })?;
    tx.execute(
        "INSERT INTO courses(id, code, title, subject, teacher_id, term, frozen, continued_from)
         VALUES(?, ?, ?, ?, ?, ?, 0, ?)",
        (
            &new_id,
            &course.code,
            &course.title,
            &course.subject,
            &course.teacher_id,
            &term,
            &course.id,
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "courses" })),
    })?;

    // Roster carries over; attendance, grades, and assignments start fresh.
    let student_ids: Vec<String> = {
        let mut stmt = tx
            .prepare("SELECT student_id FROM enrollments WHERE course_id = ? ORDER BY student_id")
            .map_err(|e| HandlerErr {
                code: "db_query_failed",
                message: e.to_string(),
                details: None,
            })?;
        stmt.query_map([&course_id], |r| r.get::<_, String>(0))
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(|e| HandlerErr {
                code: "db_query_failed",
                message: e.to_string(),
                details: None,
            })?
    };
    for student_id in &student_ids {
        tx.execute(
            "INSERT INTO enrollments(id, course_id, student_id, enrolled_at)
             VALUES(?, ?, ?, ?)",
            (Uuid::new_v4().to_string(), &new_id, student_id, &today),
        )
        .map_err(|e| HandlerErr {
            code: "db_insert_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "enrollments" })),
        })?;
    }
    tx.commit().map_err(|e| HandlerErr {
        code: "db_commit_failed",
        message: e.to_string(),
        details: None,
    })?;

    Ok(json!({
        "courseId": new_id,
        "continuedFrom": course.id,
        "term": term,
        "carriedEnrollments": student_ids.len(),
    }))
}

fn handle(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&Connection, &Session, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let session = match require_session(req) {
        Ok(s) => s.clone(),
        Err(e) => return e.response(&req.id),
    };
    match f(&state.db, &session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle(state, req, |c, s, _| courses_list(c, s))),
        "courses.freeze" => Some(handle(state, req, |c, s, p| {
            courses_set_frozen(c, s, p, true)
        })),
        "courses.unfreeze" => Some(handle(state, req, |c, s, p| {
            courses_set_frozen(c, s, p, false)
        })),
        "courses.continue" => Some(handle(state, req, courses_continue)),
        _ => None,
    }
}
