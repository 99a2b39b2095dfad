use std::sync::Arc;

use serde_json::Value;

use super::validators::{BoxedValidator, Validator};
use super::Schema;

/// The data type of a field.
#[derive(Clone)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    /// ISO 8601 date and time.
    DateTime,
    /// ISO 8601 calendar date.
    Date,
    Email,
    Url,
    Uuid,
    List(Box<Field>),
    Nested(Arc<Schema>),
    /// Free-form mapping, optionally with typed values.
    Dict(Option<Box<Field>>),
    /// Any JSON value, passed through untouched.
    Raw,
    /// An uploaded file (multipart).
    File,
}

impl FieldKind {
    /// Short name used in logs and debug output.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Date => "date",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::Uuid => "uuid",
            FieldKind::List(_) => "list",
            FieldKind::Nested(_) => "nested",
            FieldKind::Dict(_) => "dict",
            FieldKind::Raw => "raw",
            FieldKind::File => "file",
        }
    }
}

impl std::fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::List(inner) => write!(f, "List({:?})", inner.kind),
            FieldKind::Nested(schema) => {
                write!(f, "Nested({})", schema.name().unwrap_or("<inline>"))
            }
            other => f.write_str(other.name()),
        }
    }
}

/// One field of a [`Schema`]: its type, load/dump options and validators.
///
/// Fields are built with the constructor functions in
/// [`fields`](crate::fields) and refined with the builder methods below.
#[derive(Clone)]
pub struct Field {
    pub kind: FieldKind,
    pub required: bool,
    pub allow_none: bool,
    pub load_default: Option<Value>,
    pub dump_default: Option<Value>,
    pub load_only: bool,
    pub dump_only: bool,
    /// Name of the field in the external representation, when it differs
    /// from the attribute name.
    pub data_key: Option<String>,
    pub description: Option<String>,
    pub example: Option<Value>,
    pub validators: Vec<BoxedValidator>,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("allow_none", &self.allow_none)
            .field("data_key", &self.data_key)
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            allow_none: false,
            load_default: None,
            dump_default: None,
            load_only: false,
            dump_only: false,
            data_key: None,
            description: None,
            example: None,
            validators: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allow_none(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Value used when the field is missing from the input. A `null`
    /// default implies `allow_none`.
    pub fn load_default(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            self.allow_none = true;
        }
        self.load_default = Some(value);
        self
    }

    /// Value used when the field is missing from the output object.
    pub fn dump_default(mut self, value: impl Into<Value>) -> Self {
        self.dump_default = Some(value.into());
        self
    }

    pub fn load_only(mut self) -> Self {
        self.load_only = true;
        self
    }

    pub fn dump_only(mut self) -> Self {
        self.dump_only = true;
        self
    }

    pub fn data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn validate<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Key used for this field in external data.
    pub fn external_key<'a>(&'a self, name: &'a str) -> &'a str {
        self.data_key.as_deref().unwrap_or(name)
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, FieldKind::List(_))
    }
}
