use serde_json::{Map, Value};

use super::field::{Field, FieldKind};
use super::Schema;

impl Schema {
    /// Shape one object for output: keep declared, non-`load_only` fields,
    /// rename them to their `data_key`, fill `dump_default`s.
    ///
    /// No validation happens on the way out.
    pub fn dump(&self, obj: &Value) -> Value {
        let Some(input) = obj.as_object() else {
            return Value::Object(Map::new());
        };
        let mut out = Map::new();
        for (name, field) in &self.fields {
            if field.load_only {
                continue;
            }
            let key = field.external_key(name).to_string();
            match input.get(name) {
                Some(value) => {
                    out.insert(key, dump_field(field, value));
                }
                None => {
                    if let Some(default) = &field.dump_default {
                        out.insert(key, default.clone());
                    }
                }
            }
        }
        Value::Object(out)
    }

    /// Dump a list of objects. A single object is dumped as a one-item list.
    pub fn dump_many(&self, obj: &Value) -> Value {
        match obj {
            Value::Array(items) => Value::Array(items.iter().map(|item| self.dump(item)).collect()),
            Value::Null => Value::Array(Vec::new()),
            other => Value::Array(vec![self.dump(other)]),
        }
    }
}

fn dump_field(field: &Field, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match &field.kind {
        FieldKind::Nested(schema) => match value {
            Value::Object(_) | Value::Array(_) => schema.dump_value(value),
            other => other.clone(),
        },
        FieldKind::List(inner) => match value {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| dump_field(inner, item)).collect())
            }
            other => other.clone(),
        },
        FieldKind::Dict(Some(values)) => match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), dump_field(values, v)))
                    .collect(),
            ),
            other => other.clone(),
        },
        FieldKind::File => match value {
            // Uploaded files are described, never echoed back.
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(k, _)| k.as_str() != "data")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            other => other.clone(),
        },
        _ => value.clone(),
    }
}
