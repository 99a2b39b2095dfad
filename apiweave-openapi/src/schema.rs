//! Conversion of apiweave schemas into OpenAPI schema objects, and the
//! registry that collects named schemas under `components.schemas`.

use std::collections::BTreeMap;

use apiweave_core::schema::{Field, FieldKind, Schema, SchemaRef};
use serde_json::{json, Map, Value};

use crate::builder::SpecError;

/// Named schemas of the document, keyed by component name.
///
/// A name is registered once. Registering a different definition under a
/// name that is already taken is a [`SpecError::SchemaConflict`].
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Value>,
    nullable_type_arrays: bool,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry rendering nullability the OpenAPI 3.1 way
    /// (`"type": ["string", "null"]`) instead of `nullable: true`.
    pub fn openapi_31() -> Self {
        Self {
            nullable_type_arrays: true,
            ..Self::default()
        }
    }

    /// Register `schema` under `name` and return its `$ref` object.
    pub fn register(&mut self, name: &str, schema: Value) -> Result<Value, SpecError> {
        match self.schemas.get(name) {
            Some(existing) if *existing != schema => {
                return Err(SpecError::SchemaConflict {
                    name: name.to_string(),
                })
            }
            Some(_) => {}
            None => {
                self.schemas.insert(name.to_string(), schema);
            }
        }
        Ok(reference(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn into_schemas(self) -> Map<String, Value> {
        self.schemas.into_iter().collect()
    }

    /// The OpenAPI schema of a route input or output: a `$ref` for named
    /// schemas (registered on the way), the object itself otherwise.
    pub fn schema_ref(&mut self, schema: &SchemaRef) -> Result<Value, SpecError> {
        match schema {
            SchemaRef::Named(schema) | SchemaRef::Inline(schema) => self.schema_value(schema),
            SchemaRef::Raw(raw) => Ok(raw.clone()),
            SchemaRef::Empty => Ok(json!({})),
            SchemaRef::File { format } => Ok(json!({"type": "string", "format": format})),
        }
    }

    /// Like [`schema_ref`](Self::schema_ref) for a [`Schema`], honoring
    /// `many`.
    pub fn schema_value(&mut self, schema: &Schema) -> Result<Value, SpecError> {
        let item = match schema.name() {
            Some(name) => {
                let object = self.object(schema)?;
                self.register(name, object)?
            }
            None => self.object(schema)?,
        };
        Ok(if schema.is_many() {
            json!({"type": "array", "items": item})
        } else {
            item
        })
    }

    /// The object schema of `schema`'s fields, never a `$ref`.
    pub fn object(&mut self, schema: &Schema) -> Result<Value, SpecError> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, field) in schema.fields() {
            let key = field.external_key(name).to_string();
            if field.required {
                required.push(Value::String(key.clone()));
            }
            properties.insert(key, self.field(field)?);
        }

        let mut object = Map::new();
        object.insert("type".into(), json!("object"));
        object.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            object.insert("required".into(), Value::Array(required));
        }
        if let Some(description) = schema.description_text() {
            object.insert("description".into(), json!(description));
        }
        Ok(Value::Object(object))
    }

    /// The schema of one field: its type, format, options and validator
    /// keywords.
    pub fn field(&mut self, field: &Field) -> Result<Value, SpecError> {
        let mut schema = match &field.kind {
            FieldKind::Nested(nested) => {
                let value = self.schema_value(nested)?;
                if is_reference(&value) {
                    return Ok(self.decorate_reference(value, field));
                }
                into_map(value)
            }
            kind => self.kind(kind)?,
        };

        if field.dump_only {
            schema.insert("readOnly".into(), Value::Bool(true));
        }
        if field.load_only {
            schema.insert("writeOnly".into(), Value::Bool(true));
        }
        if let Some(default) = &field.load_default {
            schema.insert("default".into(), default.clone());
        }
        if let Some(description) = &field.description {
            schema.insert("description".into(), json!(description));
        }
        if let Some(example) = &field.example {
            schema.insert("example".into(), example.clone());
        }
        for validator in &field.validators {
            validator.json_schema(&mut schema);
        }
        if field.allow_none {
            self.make_nullable(&mut schema);
        }
        Ok(Value::Object(schema))
    }

    fn kind(&mut self, kind: &FieldKind) -> Result<Map<String, Value>, SpecError> {
        let value = match kind {
            FieldKind::String => json!({"type": "string"}),
            FieldKind::Integer => json!({"type": "integer"}),
            FieldKind::Float => json!({"type": "number"}),
            FieldKind::Boolean => json!({"type": "boolean"}),
            FieldKind::DateTime => json!({"type": "string", "format": "date-time"}),
            FieldKind::Date => json!({"type": "string", "format": "date"}),
            FieldKind::Email => json!({"type": "string", "format": "email"}),
            FieldKind::Url => json!({"type": "string", "format": "url"}),
            FieldKind::Uuid => json!({"type": "string", "format": "uuid"}),
            FieldKind::File => json!({"type": "string", "format": "binary"}),
            FieldKind::Raw => json!({}),
            FieldKind::List(item) => json!({"type": "array", "items": self.field(item)?}),
            FieldKind::Dict(None) => json!({"type": "object"}),
            FieldKind::Dict(Some(values)) => {
                json!({"type": "object", "additionalProperties": self.field(values)?})
            }
            FieldKind::Nested(schema) => self.schema_value(schema)?,
        };
        Ok(into_map(value))
    }

    /// Sibling keywords next to `$ref` are ignored by 3.0 tooling, so a
    /// referenced nested schema with options is wrapped in `allOf`.
    fn decorate_reference(&self, reference: Value, field: &Field) -> Value {
        let decorated = field.allow_none
            || field.dump_only
            || field.load_only
            || field.description.is_some();
        if !decorated {
            return reference;
        }
        let mut schema = Map::new();
        if field.allow_none && self.nullable_type_arrays {
            schema.insert("anyOf".into(), json!([reference, {"type": "null"}]));
        } else {
            schema.insert("allOf".into(), json!([reference]));
            if field.allow_none {
                schema.insert("nullable".into(), Value::Bool(true));
            }
        }
        if field.dump_only {
            schema.insert("readOnly".into(), Value::Bool(true));
        }
        if field.load_only {
            schema.insert("writeOnly".into(), Value::Bool(true));
        }
        if let Some(description) = &field.description {
            schema.insert("description".into(), json!(description));
        }
        Value::Object(schema)
    }

    fn make_nullable(&self, schema: &mut Map<String, Value>) {
        if !self.nullable_type_arrays {
            schema.insert("nullable".into(), Value::Bool(true));
            return;
        }
        match schema.get_mut("type") {
            Some(Value::String(ty)) => {
                let ty = std::mem::take(ty);
                schema.insert("type".into(), json!([ty, "null"]));
            }
            Some(Value::Array(types)) => {
                if !types.iter().any(|t| t == "null") {
                    types.push(json!("null"));
                }
            }
            _ => {}
        }
    }
}

/// `{"$ref": "#/components/schemas/<name>"}`.
pub fn reference(name: &str) -> Value {
    json!({"$ref": format!("#/components/schemas/{name}")})
}

fn is_reference(value: &Value) -> bool {
    value.get("$ref").is_some()
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiweave_core::fields;
    use apiweave_core::validate::{Length, OneOf, Range};

    fn pet() -> Schema {
        Schema::new("Pet")
            .field("id", fields::integer().dump_only())
            .field(
                "name",
                fields::string().required().validate(Length::new().min(1).max(10)),
            )
            .field("category", fields::string().validate(OneOf::new(["dog", "cat"])))
    }

    #[test]
    fn named_schema_is_registered_and_referenced() {
        let mut registry = SchemaRegistry::new();
        let value = registry.schema_ref(&pet().into()).unwrap();
        assert_eq!(value, json!({"$ref": "#/components/schemas/Pet"}));

        let schemas = registry.into_schemas();
        let pet = &schemas["Pet"];
        assert_eq!(pet["required"], json!(["name"]));
        assert_eq!(pet["properties"]["id"]["readOnly"], true);
        assert_eq!(pet["properties"]["name"]["minLength"], 1);
        assert_eq!(pet["properties"]["name"]["maxLength"], 10);
        assert_eq!(pet["properties"]["category"]["enum"], json!(["dog", "cat"]));
    }

    #[test]
    fn same_definition_registers_once() {
        let mut registry = SchemaRegistry::new();
        registry.schema_ref(&pet().into()).unwrap();
        registry.schema_ref(&pet().into()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_definitions_under_one_name_conflict() {
        let mut registry = SchemaRegistry::new();
        registry.schema_ref(&pet().into()).unwrap();
        let other = Schema::new("Pet").field("nickname", fields::string());
        let err = registry.schema_ref(&other.into()).unwrap_err();
        assert!(matches!(err, SpecError::SchemaConflict { ref name } if name == "Pet"));
    }

    #[test]
    fn nested_named_schemas_are_promoted() {
        let owner = Schema::new("Owner")
            .field("pets", fields::list(fields::nested(pet())))
            .field("best", fields::nested(pet()).allow_none());
        let mut registry = SchemaRegistry::new();
        registry.schema_ref(&owner.into()).unwrap();
        let schemas = registry.into_schemas();

        assert!(schemas.contains_key("Pet"));
        let props = &schemas["Owner"]["properties"];
        assert_eq!(props["pets"]["items"]["$ref"], "#/components/schemas/Pet");
        assert_eq!(props["best"]["allOf"][0]["$ref"], "#/components/schemas/Pet");
        assert_eq!(props["best"]["nullable"], true);
    }

    #[test]
    fn many_wraps_in_an_array() {
        let mut registry = SchemaRegistry::new();
        let value = registry.schema_value(&pet().many()).unwrap();
        assert_eq!(value["type"], "array");
        assert_eq!(value["items"]["$ref"], "#/components/schemas/Pet");
    }

    #[test]
    fn nullability_follows_the_document_version() {
        let field = fields::integer().allow_none().validate(Range::new().min(1));

        let mut v30 = SchemaRegistry::new();
        let schema = v30.field(&field).unwrap();
        assert_eq!(schema, json!({"type": "integer", "minimum": 1, "nullable": true}));

        let mut v31 = SchemaRegistry::openapi_31();
        let schema = v31.field(&field).unwrap();
        assert_eq!(schema["type"], json!(["integer", "null"]));
    }

    #[test]
    fn file_and_raw_schemas_render_in_place() {
        let mut registry = SchemaRegistry::new();
        assert_eq!(
            registry.schema_ref(&SchemaRef::File { format: "binary".into() }).unwrap(),
            json!({"type": "string", "format": "binary"})
        );
        assert_eq!(registry.schema_ref(&SchemaRef::Empty).unwrap(), json!({}));
        assert!(registry.is_empty());
    }
}
