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
struct MessageRow {
    id: String,
    sender_id: String,
    recipient_id: String,
}

fn load_message(conn: &Connection, message_id: &str) -> Result<MessageRow, HandlerErr> {
    conn.query_row(
        "SELECT id, sender_id, recipient_id FROM messages WHERE id = ?",
        [message_id],
        |r| {
            Ok(MessageRow {
                id: r.get(0)?,
                sender_id: r.get(1)?,
                recipient_id: r.get(2)?,
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
        message: "message not found".to_string(),
        details: None,
    })
}

/// Inbox and outbox in one listing, newest first.
fn messages_list(conn: &Connection, session: &Session) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT m.id, m.sender_id,
                    (SELECT u.last_name || ', ' || u.first_name FROM users u WHERE u.id = m.sender_id),
                    m.recipient_id,
                    (SELECT u.last_name || ', ' || u.first_name FROM users u WHERE u.id = m.recipient_id),
                    m.subject, m.body, m.sent_at, m.read_flag
             FROM messages m
             WHERE m.sender_id = ? OR m.recipient_id = ?
             ORDER BY m.sent_at DESC",
        )
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?;
    let rows = stmt
        .query_map([&session.user_id, &session.user_id], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "senderId": r.get::<_, String>(1)?,
                "senderName": r.get::<_, String>(2)?,
                "recipientId": r.get::<_, String>(3)?,
                "recipientName": r.get::<_, String>(4)?,
                "subject": r.get::<_, String>(5)?,
                "body": r.get::<_, String>(6)?,
                "sentAt": r.get::<_, String>(7)?,
                "read": r.get::<_, i64>(8)? != 0,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?;

    Ok(json!({ "messages": rows }))
}

fn messages_send(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let recipient_id = get_required_str(params, "recipientId")?;
    let body = get_required_str(params, "body")?;
    if body.trim().is_empty() {
        return Err(HandlerErr {
            code: "bad_params",
            message: "body must not be empty".to_string(),
            details: None,
        });
    }
    let subject = params
        .get("subject")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let recipient_exists = conn
        .query_row("SELECT 1 FROM users WHERE id = ?", [&recipient_id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()
        .map_err(|e| HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        })?
        .is_some();
    if !recipient_exists {
        return Err(HandlerErr {
            code: "not_found",
            message: "recipient not found".to_string(),
            details: None,
        });
    }

    let message_id = Uuid::new_v4().to_string();
    let sent_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    conn.execute(
        "INSERT INTO messages(id, sender_id, recipient_id, subject, body, sent_at, read_flag)
         VALUES(?, ?, ?, ?, ?, ?, 0)",
        (
            &message_id,
            &session.user_id,
            &recipient_id,
            &subject,
            &body,
            &sent_at,
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "messages" })),
    })?;

    Ok(json!({ "messageId": message_id, "sentAt": sent_at }))
}

fn messages_mark_read(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let message_id = get_required_str(params, "messageId")?;
    let msg = load_message(conn, &message_id)?;
    if msg.recipient_id != session.user_id {
        return Err(HandlerErr {
            code: "forbidden",
            message: "only the recipient can mark a message read".to_string(),
            details: None,
        });
    }
    conn.execute("UPDATE messages SET read_flag = 1 WHERE id = ?", [&msg.id])
        .map_err(|e| HandlerErr {
            code: "db_update_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "messages" })),
        })?;
    Ok(json!({ "messageId": msg.id, "read": true }))
}

fn messages_delete(
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let message_id = get_required_str(params, "messageId")?;
    let msg = load_message(conn, &message_id)?;
    if msg.sender_id != session.user_id && msg.recipient_id != session.user_id {
        return Err(HandlerErr {
            code: "forbidden",
            message: "message belongs to another conversation".to_string(),
            details: None,
        });
    }
    conn.execute("DELETE FROM messages WHERE id = ?", [&msg.id])
        .map_err(|e| HandlerErr {
            code: "db_delete_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "messages" })),
        })?;
    Ok(json!({ "messageId": msg.id, "deleted": true }))
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
        "messages.list" => Some(handle(state, req, |c, s, _| messages_list(c, s))),
        "messages.send" => Some(handle(state, req, messages_send)),
        "messages.markRead" => Some(handle(state, req, messages_mark_read)),
        "messages.delete" => Some(handle(state, req, messages_delete)),
        _ => None,
    }
}
