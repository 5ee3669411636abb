// ABOUTME: JSON envelope helpers shared by every handler.
// ABOUTME: Success bodies carry status "ok" plus fields; errors carry status "error" with code and message.

use serde_json::{Map, Value, json};

/// `{"status": "ok", ...fields}`. Non-object `fields` are ignored.
pub fn success(fields: Value) -> Value {
    let mut body = Map::new();
    body.insert("status".to_string(), Value::from("ok"));
    if let Value::Object(fields) = fields {
        body.extend(fields);
    }
    Value::Object(body)
}

/// `{"status": "error", "error": {"code": code, "message": message}}`.
pub fn failure(code: u16, message: impl Into<String>) -> Value {
    json!({
        "status": "error",
        "error": {
            "code": code,
            "message": message.into(),
        }
    })
}
