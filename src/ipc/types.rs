use rusqlite::Connection;
use serde::Deserialize;

/// The caller-supplied session context. Trusted as-is; the router only
/// decides whether the stated role may call the requested method.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub session: Option<Session>,
}

pub struct AppState {
    pub db: Connection,
}
