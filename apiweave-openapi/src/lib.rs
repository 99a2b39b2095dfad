//! OpenAPI document generation for apiweave.
//!
//! [`OpenApiPlugin`] turns the metadata of every registered route into an
//! OpenAPI 3 document and serves it together with an interactive docs page.

mod builder;
mod config;
mod plugin;
pub mod schema;
mod ui;

pub use builder::{build_spec, openapi_path, render_spec, write_local_spec, SpecError};
pub use config::{DocsUi, ExternalDocs, OpenApiConfig, SpecFormat, SpecProcessor, Tag, UiAssets};
pub use plugin::{openapi_routes, OpenApiPlugin};
pub use schema::SchemaRegistry;
