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

#[derive(Debug, Clone)]
struct RoomRow {
    id: String,
    course_id: String,
    host_id: String,
    title: String,
    join_code: String,
    open: bool,
}

fn load_room(conn: &Connection, room_id: &str) -> Result<RoomRow, HandlerErr> {
    conn.query_row(
        "SELECT id, course_id, host_id, title, join_code, open_flag
         FROM game_rooms WHERE id = ?",
        [room_id],
        |r| {
            Ok(RoomRow {
                id: r.get(0)?,
                course_id: r.get(1)?,
                host_id: r.get(2)?,
                title: r.get(3)?,
                join_code: r.get(4)?,
                open: r.get::<_, i64>(5)? != 0,
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
        message: "room not found".to_string(),
        details: None,
    })
}

fn is_enrolled(conn: &Connection, course_id: &str, user_id: &str) -> Result<bool, HandlerErr> {
    conn.query_row(
        "SELECT 1 FROM enrollments WHERE course_id = ? AND student_id = ?",
        (course_id, user_id),
        |r| r.get::<_, i64>(0),
    )
    .optional()
    .map(|v| v.is_some())
    .map_err(|e| HandlerErr {
        code: "db_query_failed",
        message: e.to_string(),
        details: None,
    })
}

/// Six uppercase hex characters, regenerated on the rare collision.
fn new_join_code(conn: &Connection) -> Result<String, HandlerErr> {
    for _ in 0..8 {
        let code: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(6)
            .collect::<String>()
            .to_ascii_uppercase();
        let taken = conn
            .query_row(
                "SELECT 1 FROM game_rooms WHERE join_code = ?",
                [&code],
                |r| r.get::<_, i64>(0),
            )
            .optional()
            .map_err(|e| HandlerErr {
                code: "db_query_failed",
                message: e.to_string(),
                details: None,
            })?
            .is_some();
        if !taken {
            return Ok(code);
        }
    }
    Err(HandlerErr {
        code: "internal",
        message: "could not allocate a join code".to_string(),
        details: None,
    })
}

fn games_create_room(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let course_id = get_required_str(params, "courseId")?;
    let title = get_required_str(params, "title")?;
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(HandlerErr {
            code: "bad_params",
            message: "title must not be empty".to_string(),
            details: None,
        });
    }

    let teacher_id: Option<String> = conn
        .query_row(
            "SELECT teacher_id FROM courses WHERE id = ?",
            [&course_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?;
    let Some(teacher_id) = teacher_id else {
        return Err(HandlerErr {
            code: "not_found",
            message: "course not found".to_string(),
            details: None,
        });
    };
    if session.role != "admin" && teacher_id != session.user_id {
        return Err(HandlerErr {
            code: "forbidden",
            message: "course belongs to another teacher".to_string(),
            details: None,
        });
    }

    let room_id = Uuid::new_v4().to_string();
    let join_code = new_join_code(conn)?;
    let created_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    conn.execute(
        "INSERT INTO game_rooms(id, course_id, host_id, title, join_code, open_flag, created_at)
         VALUES(?, ?, ?, ?, ?, 1, ?)",
        (
            &room_id,
            &course_id,
            &session.user_id,
            &title,
            &join_code,
            &created_at,
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "game_rooms" })),
    })?;

    Ok(json!({ "roomId": room_id, "joinCode": join_code }))
}

fn games_join_room(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let code = get_required_str(params, "code")?;
    let code = code.trim().to_ascii_uppercase();

    let room: Option<RoomRow> = conn
        .query_row(
            "SELECT id, course_id, host_id, title, join_code, open_flag
             FROM game_rooms WHERE join_code = ?",
            [&code],
            |r| {
                Ok(RoomRow {
                    id: r.get(0)?,
                    course_id: r.get(1)?,
                    host_id: r.get(2)?,
                    title: r.get(3)?,
                    join_code: r.get(4)?,
                    open: r.get::<_, i64>(5)? != 0,
                })
            },
        )
        .optional()
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?;
    let Some(room) = room else {
        return Err(HandlerErr {
            code: "not_found",
            message: "no room with that code".to_string(),
            details: None,
        });
    };
    if !room.open {
        return Err(HandlerErr {
            code: "conflict",
            message: "room is closed".to_string(),
            details: None,
        });
    }
    let allowed = session.role == "admin"
        || room.host_id == session.user_id
        || is_enrolled(conn, &room.course_id, &session.user_id)?;
    if !allowed {
        return Err(HandlerErr {
            code: "forbidden",
            message: "not enrolled in this room's course".to_string(),
            details: None,
        });
    }

    // Re-joining is a no-op, not an error.
    let joined_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    conn.execute(
        "INSERT OR IGNORE INTO game_players(room_id, user_id, joined_at, score)
         VALUES(?, ?, ?, 0)",
        (&room.id, &session.user_id, &joined_at),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "game_players" })),
    })?;

    Ok(json!({ "roomId": room.id, "title": room.title }))
}

fn games_room_state(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let room_id = get_required_str(params, "roomId")?;
    let room = load_room(conn, &room_id)?;

    let mut stmt = conn
        .prepare(
            "SELECT p.user_id,
                    (SELECT u.last_name || ', ' || u.first_name FROM users u WHERE u.id = p.user_id),
                    p.joined_at, p.score
             FROM game_players p
             WHERE p.room_id = ?
             ORDER BY p.joined_at, p.user_id",
        )
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?;
    let players = stmt
        .query_map([&room.id], |r| {
            Ok(json!({
                "userId": r.get::<_, String>(0)?,
                "displayName": r.get::<_, String>(1)?,
                "joinedAt": r.get::<_, String>(2)?,
                "score": r.get::<_, i64>(3)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?;

    let is_player = players.iter().any(|p| {
        p.get("userId").and_then(|v| v.as_str()) == Some(session.user_id.as_str())
    });
    if session.role != "admin" && room.host_id != session.user_id && !is_player {
        return Err(HandlerErr {
            code: "forbidden",
            message: "join the room before reading its state".to_string(),
            details: None,
        });
    }

    Ok(json!({
        "roomId": room.id,
        "courseId": room.course_id,
        "hostId": room.host_id,
        "title": room.title,
        "joinCode": room.join_code,
        "open": room.open,
        "players": players,
    }))
}

fn games_close_room(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let room_id = get_required_str(params, "roomId")?;
    let room = load_room(conn, &room_id)?;
    if session.role != "admin" && room.host_id != session.user_id {
        return Err(HandlerErr {
            code: "forbidden",
            message: "only the host or an admin can close a room".to_string(),
            details: None,
        });
    }
    if !room.open {
        return Err(HandlerErr {
            code: "conflict",
            message: "room is already closed".to_string(),
            details: None,
        });
    }
    conn.execute("UPDATE game_rooms SET open_flag = 0 WHERE id = ?", [&room.id])
        .map_err(|e| HandlerErr {
            code: "db_update_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "game_rooms" })),
        })?;
    Ok(json!({ "roomId": room.id, "open": false }))
}

fn handle(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&Connection, &Session, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let Some(session) = req.session.clone() else {
        return err(&req.id, "unauthorized", "session required", None);
    };
    match f(&state.db, &session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "games.createRoom" => Some(handle(state, req, games_create_room)),
        "games.joinRoom" => Some(handle(state, req, games_join_room)),
        "games.roomState" => Some(handle(state, req, games_room_state)),
        "games.closeRoom" => Some(handle(state, req, games_close_room)),
        _ => None,
    }
}
