use std::collections::HashSet;

use serde_json::{Map, Value};

use super::field::{Field, FieldKind};
use super::validators::{is_email, Url};
use super::{Schema, Unknown};

pub(crate) const MISSING: &str = "Missing data for required field.";
pub(crate) const NULL: &str = "Field may not be null.";
pub(crate) const UNKNOWN: &str = "Unknown field.";
pub(crate) const INVALID_TYPE: &str = "Invalid input type.";

/// Per-field error messages, keyed like the input data.
///
/// Leaves are lists of messages; nested schemas and lists produce nested
/// objects (`{"tags": {"0": ["Not a valid string."]}}`). Whole-object errors
/// go under `_schema`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(Map<String, Value>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the list under `key`.
    pub fn push(&mut self, key: &str, message: impl Into<String>) {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(messages) => messages.push(Value::String(message.into())),
            _ => *entry = Value::Array(vec![Value::String(message.into())]),
        }
    }

    /// Store the errors of a nested value under `key`.
    pub fn nest(&mut self, key: &str, errors: FieldErrors) {
        self.0.insert(key.to_string(), Value::Object(errors.0));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for FieldErrors {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

enum Failure {
    Messages(Vec<String>),
    Nested(FieldErrors),
}

impl Failure {
    fn one(message: impl Into<String>) -> Self {
        Failure::Messages(vec![message.into()])
    }

    fn record(self, errors: &mut FieldErrors, key: &str) {
        match self {
            Failure::Messages(messages) => {
                for message in messages {
                    errors.push(key, message);
                }
            }
            Failure::Nested(nested) => errors.nest(key, nested),
        }
    }
}

impl Schema {
    /// Validate and convert one object.
    ///
    /// `unknown` applies unless the schema sets its own policy. Loaded data
    /// is keyed by field name, not by `data_key`.
    pub fn load(&self, data: &Value, unknown: Unknown) -> Result<Map<String, Value>, FieldErrors> {
        let Some(input) = data.as_object() else {
            let mut errors = FieldErrors::new();
            errors.push("_schema", INVALID_TYPE);
            return Err(errors);
        };
        let unknown = self.unknown.unwrap_or(unknown);

        let mut out = Map::new();
        let mut errors = FieldErrors::new();
        let mut known: HashSet<&str> = HashSet::new();

        for (name, field) in &self.fields {
            if field.dump_only {
                continue;
            }
            let key = field.external_key(name);
            known.insert(key);

            match input.get(key) {
                None => {
                    if let Some(default) = &field.load_default {
                        out.insert(name.clone(), default.clone());
                    } else if field.required {
                        errors.push(key, MISSING);
                    }
                }
                Some(Value::Null) => {
                    if field.allow_none {
                        out.insert(name.clone(), Value::Null);
                    } else {
                        errors.push(key, NULL);
                    }
                }
                Some(value) => match load_field(field, value) {
                    Ok(loaded) => {
                        out.insert(name.clone(), loaded);
                    }
                    Err(failure) => failure.record(&mut errors, key),
                },
            }
        }

        for (key, value) in input {
            if known.contains(key.as_str()) {
                continue;
            }
            match unknown {
                Unknown::Raise => errors.push(key, UNKNOWN),
                Unknown::Include => {
                    out.insert(key.clone(), value.clone());
                }
                Unknown::Exclude => {}
            }
        }

        if errors.is_empty() {
            for check in &self.checks {
                if let Err(message) = check(&out) {
                    errors.push("_schema", message);
                }
            }
        }

        if errors.is_empty() {
            Ok(out)
        } else {
            Err(errors)
        }
    }

    /// Load a list of objects. Errors are keyed by item index.
    pub fn load_many(
        &self,
        data: &Value,
        unknown: Unknown,
    ) -> Result<Vec<Map<String, Value>>, FieldErrors> {
        let Some(items) = data.as_array() else {
            let mut errors = FieldErrors::new();
            errors.push("_schema", INVALID_TYPE);
            return Err(errors);
        };
        let mut out = Vec::with_capacity(items.len());
        let mut errors = FieldErrors::new();
        for (i, item) in items.iter().enumerate() {
            match self.load(item, unknown) {
                Ok(loaded) => out.push(loaded),
                Err(item_errors) => errors.nest(&i.to_string(), item_errors),
            }
        }
        if errors.is_empty() {
            Ok(out)
        } else {
            Err(errors)
        }
    }
}

fn load_field(field: &Field, value: &Value) -> Result<Value, Failure> {
    let loaded = deserialize(&field.kind, value)?;
    let messages: Vec<String> = field
        .validators
        .iter()
        .filter_map(|validator| validator.validate(&loaded).err())
        .collect();
    if messages.is_empty() {
        Ok(loaded)
    } else {
        Err(Failure::Messages(messages))
    }
}

fn deserialize(kind: &FieldKind, value: &Value) -> Result<Value, Failure> {
    match kind {
        FieldKind::String => value
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| Failure::one("Not a valid string.")),
        FieldKind::Integer => load_integer(value).ok_or_else(|| Failure::one("Not a valid integer.")),
        FieldKind::Float => load_float(value),
        FieldKind::Boolean => load_boolean(value).ok_or_else(|| Failure::one("Not a valid boolean.")),
        FieldKind::DateTime => {
            let valid = value.as_str().is_some_and(|s| {
                chrono::DateTime::parse_from_rfc3339(s).is_ok()
                    || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
            });
            if valid {
                Ok(value.clone())
            } else {
                Err(Failure::one("Not a valid datetime."))
            }
        }
        FieldKind::Date => {
            let valid = value
                .as_str()
                .is_some_and(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok());
            if valid {
                Ok(value.clone())
            } else {
                Err(Failure::one("Not a valid date."))
            }
        }
        FieldKind::Email => match value.as_str() {
            Some(s) if is_email(s) => Ok(value.clone()),
            _ => Err(Failure::one("Not a valid email address.")),
        },
        FieldKind::Url => match value.as_str() {
            Some(s) if Url::new().accepts(s) => Ok(value.clone()),
            _ => Err(Failure::one("Not a valid URL.")),
        },
        FieldKind::Uuid => value
            .as_str()
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
            .map(|id| Value::String(id.hyphenated().to_string()))
            .ok_or_else(|| Failure::one("Not a valid UUID.")),
        FieldKind::List(inner) => {
            let Some(items) = value.as_array() else {
                return Err(Failure::one("Not a valid list."));
            };
            let mut out = Vec::with_capacity(items.len());
            let mut errors = FieldErrors::new();
            for (i, item) in items.iter().enumerate() {
                let key = i.to_string();
                if item.is_null() {
                    if inner.allow_none {
                        out.push(Value::Null);
                    } else {
                        errors.push(&key, NULL);
                    }
                    continue;
                }
                match load_field(inner, item) {
                    Ok(loaded) => out.push(loaded),
                    Err(failure) => failure.record(&mut errors, &key),
                }
            }
            if errors.is_empty() {
                Ok(Value::Array(out))
            } else {
                Err(Failure::Nested(errors))
            }
        }
        FieldKind::Nested(schema) => schema
            .load_value(value, schema.unknown.unwrap_or(Unknown::Raise))
            .map_err(Failure::Nested),
        FieldKind::Dict(values) => {
            let Some(map) = value.as_object() else {
                return Err(Failure::one("Not a valid mapping type."));
            };
            let Some(values) = values else {
                return Ok(value.clone());
            };
            let mut out = Map::new();
            let mut errors = FieldErrors::new();
            for (key, item) in map {
                match load_field(values, item) {
                    Ok(loaded) => {
                        out.insert(key.clone(), loaded);
                    }
                    Err(failure) => failure.record(&mut errors, key),
                }
            }
            if errors.is_empty() {
                Ok(Value::Object(out))
            } else {
                Err(Failure::Nested(errors))
            }
        }
        FieldKind::Raw => Ok(value.clone()),
        FieldKind::File => {
            if value.get("filename").is_some_and(Value::is_string) {
                Ok(value.clone())
            } else {
                Err(Failure::one("Not a valid file."))
            }
        }
    }
}

fn load_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Value::from(i));
            }
            if let Some(u) = n.as_u64() {
                return Some(Value::from(u));
            }
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| Value::from(f as i64))
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn load_float(value: &Value) -> Result<Value, Failure> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if !f.is_finite() => Err(Failure::one(
            "Special numeric values (nan or infinity) are not permitted.",
        )),
        Some(f) => Ok(Value::from(f)),
        None => Err(Failure::one("Not a valid number.")),
    }
}

fn load_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        Value::String(s) => match s.to_lowercase().as_str() {
            "t" | "true" | "on" | "y" | "yes" | "1" => Some(Value::Bool(true)),
            "f" | "false" | "off" | "n" | "no" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}
