//! Declarative schemas: validation of incoming data and shaping of
//! outgoing data.

pub mod builtin;
mod dump;
pub mod field;
mod load;
pub mod validators;

use std::sync::Arc;

use serde_json::{Map, Value};

pub use builtin::{
    empty_schema, file_schema, http_error_schema, pagination_schema, validation_error_schema,
};
pub use field::{Field, FieldKind};
pub use load::FieldErrors;

/// What to do with input keys that match no field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unknown {
    /// Report each one as `"Unknown field."`.
    Raise,
    /// Drop them silently.
    Exclude,
    /// Keep them in the loaded data as they are.
    Include,
}

type SchemaCheck = Arc<dyn Fn(&Map<String, Value>) -> Result<(), String> + Send + Sync>;

/// An ordered set of named fields.
///
/// A schema with a name is registered as an OpenAPI component and
/// referenced with `$ref`; a schema without one is rendered inline.
#[derive(Clone, Default)]
pub struct Schema {
    name: Option<String>,
    fields: Vec<(String, Field)>,
    unknown: Option<Unknown>,
    description: Option<String>,
    many: bool,
    checks: Vec<SchemaCheck>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("unknown", &self.unknown)
            .field("many", &self.many)
            .finish()
    }
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A schema without a name, rendered inline in the OpenAPI document.
    pub fn inline() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        let name = name.into();
        self.fields.retain(|(existing, _)| *existing != name);
        self.fields.push((name, field));
        self
    }

    /// Copy every field of `parent` that this schema does not declare itself.
    pub fn extend(mut self, parent: &Schema) -> Self {
        let mut fields = Vec::with_capacity(parent.fields.len() + self.fields.len());
        for (name, field) in &parent.fields {
            if !self.fields.iter().any(|(own, _)| own == name) {
                fields.push((name.clone(), field.clone()));
            }
        }
        fields.append(&mut self.fields);
        self.fields = fields;
        self
    }

    pub fn unknown(mut self, unknown: Unknown) -> Self {
        self.unknown = Some(unknown);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Treat the data as a list of objects of this schema.
    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    /// Whole-object check, run once every field loaded cleanly. Failures are
    /// reported under `_schema`.
    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<(), String> + Send + Sync + 'static,
    {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &[(String, Field)] {
        &self.fields
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    pub fn unknown_policy(&self) -> Option<Unknown> {
        self.unknown
    }

    /// Load `data`, honoring [`Schema::many`].
    pub fn load_value(&self, data: &Value, unknown: Unknown) -> Result<Value, FieldErrors> {
        if self.many {
            Ok(Value::Array(
                self.load_many(data, unknown)?
                    .into_iter()
                    .map(Value::Object)
                    .collect(),
            ))
        } else {
            self.load(data, unknown).map(Value::Object)
        }
    }

    /// Dump `obj`, honoring [`Schema::many`].
    pub fn dump_value(&self, obj: &Value) -> Value {
        if self.many {
            self.dump_many(obj)
        } else {
            self.dump(obj)
        }
    }
}

/// Typed structs that describe their own schema.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct PetIn { name: String, category: String }
///
/// impl ApiSchema for PetIn {
///     fn schema() -> Schema {
///         Schema::new("PetIn")
///             .field("name", fields::string().required())
///             .field("category", fields::string().required().validate(OneOf::new(["dog", "cat"])))
///     }
/// }
/// ```
pub trait ApiSchema {
    fn schema() -> Schema;
}

/// The schema attached to a route input or output.
#[derive(Clone, Debug)]
pub enum SchemaRef {
    /// A named schema, registered once under `components.schemas`.
    Named(Arc<Schema>),
    /// An unnamed schema, rendered in place.
    Inline(Arc<Schema>),
    /// A literal OpenAPI schema object. Documentation only: data passes
    /// through without validation.
    Raw(Value),
    /// No body schema; data passes through unchanged.
    Empty,
    /// A binary file response.
    File { format: String },
}

impl SchemaRef {
    pub fn of<T: ApiSchema>() -> Self {
        T::schema().into()
    }

    pub fn raw(schema: Value) -> Self {
        if schema.as_object().is_some_and(Map::is_empty) {
            SchemaRef::Empty
        } else {
            SchemaRef::Raw(schema)
        }
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        match self {
            SchemaRef::Named(schema) | SchemaRef::Inline(schema) => Some(schema),
            _ => None,
        }
    }

    /// Shape outgoing data. Non-field schemas pass the value through.
    pub fn dump(&self, value: &Value) -> Value {
        match self.schema() {
            Some(schema) => schema.dump_value(value),
            None => value.clone(),
        }
    }
}

impl From<Schema> for SchemaRef {
    fn from(schema: Schema) -> Self {
        if schema.name.is_some() {
            SchemaRef::Named(Arc::new(schema))
        } else {
            SchemaRef::Inline(Arc::new(schema))
        }
    }
}

impl From<Arc<Schema>> for SchemaRef {
    fn from(schema: Arc<Schema>) -> Self {
        if schema.name.is_some() {
            SchemaRef::Named(schema)
        } else {
            SchemaRef::Inline(schema)
        }
    }
}

impl From<Value> for SchemaRef {
    fn from(schema: Value) -> Self {
        SchemaRef::raw(schema)
    }
}
