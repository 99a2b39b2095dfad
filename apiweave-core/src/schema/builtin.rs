use serde_json::{json, Value};

use super::{Schema, SchemaRef};
use crate::fields;

/// OpenAPI schema of the generic error body, `{"message", "detail"}`.
pub fn http_error_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "detail": {"type": "object"},
            "message": {"type": "string"}
        }
    })
}

/// OpenAPI schema of the validation error body, whose `detail` is keyed by
/// location then field.
pub fn validation_error_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "detail": {
                "type": "object",
                "properties": {
                    "<location>": {
                        "type": "object",
                        "properties": {
                            "<field_name>": {
                                "type": "array",
                                "items": {"type": "string"}
                            }
                        }
                    }
                }
            },
            "message": {"type": "string"}
        }
    })
}

/// The `Pagination` schema produced by
/// [`pagination_builder`](crate::pagination::pagination_builder).
pub fn pagination_schema() -> Schema {
    Schema::new("Pagination")
        .field("page", fields::integer())
        .field("per_page", fields::integer())
        .field("pages", fields::integer())
        .field("total", fields::integer())
        .field("current", fields::url())
        .field("next", fields::url())
        .field("prev", fields::url())
        .field("first", fields::url())
        .field("last", fields::url())
}

/// An output that passes the handler's body through unchanged.
pub fn empty_schema() -> SchemaRef {
    SchemaRef::Empty
}

/// A binary file response, e.g. `file_schema("binary")` for an image.
pub fn file_schema(format: impl Into<String>) -> SchemaRef {
    SchemaRef::File {
        format: format.into(),
    }
}
