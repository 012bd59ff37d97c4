use crate::calendar::{month_grid, status_overlay, AttendanceRecord, AttendanceStatus, MonthGrid};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request, Session};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

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

fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("missing {}", key),
            details: None,
        })
}

#[derive(Debug, Clone)]
struct RosterStudent {
    id: String,
    display_name: String,
}

fn course_teacher(conn: &Connection, course_id: &str) -> Result<String, HandlerErr> {
    conn.query_row(
        "SELECT teacher_id FROM courses WHERE id = ?",
        [course_id],
        |r| r.get(0),
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

fn roster_for_course(conn: &Connection, course_id: &str) -> Result<Vec<RosterStudent>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.last_name, s.first_name
             FROM enrollments e
             JOIN users s ON s.id = e.student_id
             WHERE e.course_id = ?
             ORDER BY s.last_name, s.first_name",
        )
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?;
    stmt.query_map([course_id], |r| {
        let last: String = r.get(1)?;
        let first: String = r.get(2)?;
        Ok(RosterStudent {
            id: r.get(0)?,
            display_name: format!("{}, {}", last, first),
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(|e| HandlerErr {
        code: "db_query_failed",
        message: e.to_string(),
        details: None,
    })
}

fn records_in_range(
    conn: &Connection,
    course_id: &str,
    student_id: &str,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<AttendanceRecord>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT date, status FROM attendance_records
             WHERE course_id = ? AND student_id = ? AND date >= ? AND date <= ?
             ORDER BY date",
        )
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?;
    let raw = stmt
        .query_map(
            (
                course_id,
                student_id,
                first.format("%Y-%m-%d").to_string(),
                last.format("%Y-%m-%d").to_string(),
            ),
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
        )
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?;

    let mut records = Vec::with_capacity(raw.len());
    for (date_str, status_str) in raw {
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|_| HandlerErr {
            code: "internal",
            message: format!("stored attendance date is malformed: {}", date_str),
            details: None,
        })?;
        let status = AttendanceStatus::parse(&status_str).ok_or_else(|| HandlerErr {
            code: "internal",
            message: format!("stored attendance status is malformed: {}", status_str),
            details: None,
        })?;
        records.push(AttendanceRecord { date, status });
    }
    Ok(records)
}

fn grid_json(grid: &MonthGrid) -> serde_json::Value {
    let weeks: Vec<serde_json::Value> = grid
        .weeks
        .iter()
        .map(|week| {
            week.iter()
                .map(|cell| {
                    json!({
                        "date": cell.date.format("%Y-%m-%d").to_string(),
                        "inMonth": cell.in_month,
                    })
                })
                .collect()
        })
        .collect();
    json!({
        "year": grid.year,
        "month": grid.month0,
        "weeks": weeks,
    })
}

fn attendance_month_open(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let year = get_required_i64(params, "year")?;
    let month0 = get_required_i64(params, "month")?;
    if !(0..=11).contains(&month0) {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!("month index {} must be 0..=11", month0),
            details: None,
        });
    }
    let year = i32::try_from(year).map_err(|_| HandlerErr {
        code: "bad_params",
        message: "year out of range".to_string(),
        details: None,
    })?;

    let _ = course_teacher(conn, &course_id)?;
    let grid = month_grid(year, month0 as u32).map_err(|e| HandlerErr {
        code: "bad_params",
        message: e.message,
        details: None,
    })?;
    let first = grid.weeks[0][0].date;
    let last = grid.weeks[grid.weeks.len() - 1][6].date;

    let roster = roster_for_course(conn, &course_id)?;
    // Students get their own row only; staff see the whole roster.
    let visible: Vec<&RosterStudent> = if session.role == "student" {
        roster.iter().filter(|s| s.id == session.user_id).collect()
    } else {
        roster.iter().collect()
    };

    let mut rows = Vec::with_capacity(visible.len());
    for student in &visible {
        let records = records_in_range(conn, &course_id, &student.id, first, last)?;
        let marks: Vec<Vec<&'static str>> = status_overlay(&grid, &records)
            .iter()
            .map(|week| week.iter().map(|m| m.code()).collect())
            .collect();
        rows.push(json!({
            "studentId": student.id,
            "marks": marks,
        }));
    }

    let students_json: Vec<serde_json::Value> = visible
        .iter()
        .map(|s| json!({ "id": s.id, "displayName": s.display_name }))
        .collect();

    Ok(json!({
        "grid": grid_json(&grid),
        "students": students_json,
        "rows": rows,
    }))
}

fn attendance_set_status(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let student_id = get_required_str(params, "studentId")?;
    let date_str = get_required_str(params, "date")?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|_| HandlerErr {
        code: "bad_params",
        message: "date must be YYYY-MM-DD".to_string(),
        details: None,
    })?;

    // A null (or missing) status clears the record; anything else must parse.
    let status = match params.get("status") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(HandlerErr {
                    code: "bad_params",
                    message: "status must be string or null".to_string(),
                    details: None,
                });
            };
            Some(AttendanceStatus::parse(s).ok_or_else(|| HandlerErr {
                code: "bad_params",
                message: format!("unknown status: {}", s),
                details: None,
            })?)
        }
    };

    let teacher_id = course_teacher(conn, &course_id)?;
    if session.role != "admin" && teacher_id != session.user_id {
        return Err(HandlerErr {
            code: "forbidden",
            message: "course belongs to another teacher".to_string(),
            details: None,
        });
    }

    let enrolled = conn
        .query_row(
            "SELECT 1 FROM enrollments WHERE course_id = ? AND student_id = ?",
            (&course_id, &student_id),
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?
        .is_some();
    if !enrolled {
        return Err(HandlerErr {
            code: "not_found",
            message: "student not enrolled in this course".to_string(),
            details: None,
        });
    }

    match status {
        Some(status) => {
            conn.execute(
                "INSERT INTO attendance_records(course_id, student_id, date, status)
                 VALUES(?, ?, ?, ?)
                 ON CONFLICT(course_id, student_id, date) DO UPDATE SET
                   status = excluded.status",
                (&course_id, &student_id, &date_str, status.code()),
            )
            .map_err(|e| HandlerErr {
                code: "db_update_failed",
                message: e.to_string(),
                details: Some(json!({ "table": "attendance_records" })),
            })?;
            Ok(json!({
                "courseId": course_id,
                "studentId": student_id,
                "date": date.format("%Y-%m-%d").to_string(),
                "status": status.code(),
            }))
        }
        None => {
            conn.execute(
                "DELETE FROM attendance_records
                 WHERE course_id = ? AND student_id = ? AND date = ?",
                (&course_id, &student_id, &date_str),
            )
            .map_err(|e| HandlerErr {
                code: "db_delete_failed",
                message: e.to_string(),
                details: Some(json!({ "table": "attendance_records" })),
            })?;
            Ok(json!({
                "courseId": course_id,
                "studentId": student_id,
                "date": date.format("%Y-%m-%d").to_string(),
                "status": serde_json::Value::Null,
            }))
        }
    }
}

fn handle_month_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = req.session.as_ref() else {
        return err(&req.id, "unauthorized", "session required", None);
    };
    match attendance_month_open(&state.db, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = req.session.as_ref() else {
        return err(&req.id, "unauthorized", "session required", None);
    };
    match attendance_set_status(&state.db, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.monthOpen" => Some(handle_month_open(state, req)),
        "attendance.setStatus" => Some(handle_set_status(state, req)),
        _ => None,
    }
}
