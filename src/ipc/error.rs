use serde_json::json;

/// Every response carries the request id plus either `result` or `error`.
/// `bad_params` stands in for the HTTP 400 class, `internal` and the `db_*`
/// codes for the 500 class; clients switch on `error.code`, never on message
/// text.
pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}
