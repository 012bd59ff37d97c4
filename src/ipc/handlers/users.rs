use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_users_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let role_filter = req.params.get("role").and_then(|v| v.as_str());

    let sql = match role_filter {
        Some(_) => {
            "SELECT id, last_name, first_name, email, role FROM users
             WHERE role = ? ORDER BY last_name, first_name"
        }
        None => {
            "SELECT id, last_name, first_name, email, role FROM users
             ORDER BY role, last_name, first_name"
        }
    };
    let mut stmt = match state.db.prepare(sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let map_row = |r: &rusqlite::Row| -> rusqlite::Result<serde_json::Value> {
        let last: String = r.get(1)?;
        let first: String = r.get(2)?;
        Ok(json!({
            "id": r.get::<_, String>(0)?,
            "displayName": format!("{}, {}", last, first),
            "email": r.get::<_, String>(3)?,
            "role": r.get::<_, String>(4)?,
        }))
    };
    let rows = match role_filter {
        Some(role) => stmt.query_map([role], map_row),
        None => stmt.query_map([], map_row),
    }
    .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(users) => ok(&req.id, json!({ "users": users })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.list" => Some(handle_users_list(state, req)),
        _ => None,
    }
}
