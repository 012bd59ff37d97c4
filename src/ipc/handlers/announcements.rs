use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_announcements_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = req.params.get("courseId").and_then(|v| v.as_str());

    // School-wide announcements (course_id NULL) are always included.
    let sql = match course_id {
        Some(_) => {
            "SELECT a.id, a.author_id,
                    (SELECT u.last_name || ', ' || u.first_name FROM users u WHERE u.id = a.author_id),
                    a.course_id, a.title, a.body, a.posted_at
             FROM announcements a
             WHERE a.course_id IS NULL OR a.course_id = ?
             ORDER BY a.posted_at DESC"
        }
        None => {
            "SELECT a.id, a.author_id,
                    (SELECT u.last_name || ', ' || u.first_name FROM users u WHERE u.id = a.author_id),
                    a.course_id, a.title, a.body, a.posted_at
             FROM announcements a
             ORDER BY a.posted_at DESC"
        }
    };

    let mut stmt = match state.db.prepare(sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let map_row = |r: &rusqlite::Row| -> rusqlite::Result<serde_json::Value> {
        Ok(json!({
            "id": r.get::<_, String>(0)?,
            "authorId": r.get::<_, String>(1)?,
            "authorName": r.get::<_, String>(2)?,
            "courseId": r.get::<_, Option<String>>(3)?,
            "title": r.get::<_, String>(4)?,
            "body": r.get::<_, String>(5)?,
            "postedAt": r.get::<_, String>(6)?,
        }))
    };
    let rows = match course_id {
        Some(cid) => stmt.query_map([cid], map_row),
        None => stmt.query_map([], map_row),
    }
    .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(announcements) => ok(&req.id, json!({ "announcements": announcements })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_announcements_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = req.session.as_ref() else {
        return err(&req.id, "unauthorized", "session required", None);
    };
    let title = match req.params.get("title").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing title", None),
    };
    let body = match req.params.get("body").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing body", None),
    };
    if title.is_empty() {
        return err(&req.id, "bad_params", "title must not be empty", None);
    }
    let course_id = req
        .params
        .get("courseId")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    if let Some(cid) = course_id.as_deref() {
        let exists: Option<i64> = match state
            .db
            .query_row("SELECT 1 FROM courses WHERE id = ?", [cid], |r| r.get(0))
            .optional()
        {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        if exists.is_none() {
            return err(&req.id, "not_found", "course not found", None);
        }
    }

    let announcement_id = Uuid::new_v4().to_string();
    let posted_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    if let Err(e) = state.db.execute(
        "INSERT INTO announcements(id, author_id, course_id, title, body, posted_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &announcement_id,
            &session.user_id,
            &course_id,
            &title,
            &body,
            &posted_at,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "announcements" })),
        );
    }

    ok(
        &req.id,
        json!({ "announcementId": announcement_id, "postedAt": posted_at }),
    )
}

fn handle_announcements_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = req.session.as_ref() else {
        return err(&req.id, "unauthorized", "session required", None);
    };
    let announcement_id = match req.params.get("announcementId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing announcementId", None),
    };

    let author_id: Option<String> = match state
        .db
        .query_row(
            "SELECT author_id FROM announcements WHERE id = ?",
            [&announcement_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some(author_id) = author_id else {
        return err(&req.id, "not_found", "announcement not found", None);
    };
    if session.role != "admin" && author_id != session.user_id {
        return err(
            &req.id,
            "forbidden",
            "only the author or an admin can delete an announcement",
            None,
        );
    }

    if let Err(e) = state
        .db
        .execute("DELETE FROM announcements WHERE id = ?", [&announcement_id])
    {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "announcements" })),
        );
    }

    ok(&req.id, json!({ "announcementId": announcement_id, "deleted": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "announcements.list" => Some(handle_announcements_list(state, req)),
        "announcements.create" => Some(handle_announcements_create(state, req)),
        "announcements.delete" => Some(handle_announcements_delete(state, req)),
        _ => None,
    }
}
