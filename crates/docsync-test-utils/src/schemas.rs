//! Sample schemas and documents shared by test suites.

use serde_json::{Value, json};

/// A `users` schema: `id`, `name` and `email` required, `email` must look
/// like an address, `age` is an optional integer.
pub fn users_schema() -> Value {
    json!({
        "type": "object",
        "required": ["id", "name", "email"],
        "properties": {
            "id": {"type": "integer"},
            "name": {"type": "string"},
            "email": {"type": "string", "format": "email"},
            "age": {"type": "integer"},
            "active": {"type": "boolean"}
        }
    })
}

/// Three users satisfying [`users_schema`].
pub fn sample_users() -> Value {
    json!([
        {"id": 1, "name": "Ada", "email": "ada@example.com", "age": 36, "active": true},
        {"id": 2, "name": "Grace", "email": "grace@example.com", "age": 45, "active": false},
        {"id": 3, "name": "Linus", "email": "linus@example.com", "active": true}
    ])
}
