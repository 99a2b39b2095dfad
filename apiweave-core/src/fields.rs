//! Field constructors.
//!
//! ```
//! use apiweave_core::fields;
//! use apiweave_core::schema::Schema;
//! use apiweave_core::validate::{Length, OneOf};
//!
//! let pet_in = Schema::new("PetIn")
//!     .field("name", fields::string().required().validate(Length::new().min(1).max(10)))
//!     .field("category", fields::string().required().validate(OneOf::new(["dog", "cat"])));
//! ```

use std::sync::Arc;

pub use crate::schema::field::{Field, FieldKind};
use crate::schema::{ApiSchema, Schema};

pub fn string() -> Field {
    Field::new(FieldKind::String)
}

pub fn integer() -> Field {
    Field::new(FieldKind::Integer)
}

pub fn float() -> Field {
    Field::new(FieldKind::Float)
}

pub fn boolean() -> Field {
    Field::new(FieldKind::Boolean)
}

pub fn datetime() -> Field {
    Field::new(FieldKind::DateTime)
}

pub fn date() -> Field {
    Field::new(FieldKind::Date)
}

pub fn email() -> Field {
    Field::new(FieldKind::Email)
}

pub fn url() -> Field {
    Field::new(FieldKind::Url)
}

pub fn uuid() -> Field {
    Field::new(FieldKind::Uuid)
}

pub fn list(inner: Field) -> Field {
    Field::new(FieldKind::List(Box::new(inner)))
}

pub fn nested(schema: Schema) -> Field {
    Field::new(FieldKind::Nested(Arc::new(schema)))
}

/// Nested field whose schema comes from a typed struct.
pub fn nested_of<T: ApiSchema>() -> Field {
    nested(T::schema())
}

pub fn dict() -> Field {
    Field::new(FieldKind::Dict(None))
}

pub fn dict_of(values: Field) -> Field {
    Field::new(FieldKind::Dict(Some(Box::new(values))))
}

pub fn raw() -> Field {
    Field::new(FieldKind::Raw)
}

pub fn file() -> Field {
    Field::new(FieldKind::File)
}
