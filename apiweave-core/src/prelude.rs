//! Everything a route module needs, with a single `use`.
//!
//! ```ignore
//! use apiweave_core::prelude::*;
//!
//! async fn create_pet(JsonBody(pet): JsonBody<PetIn>) -> Result<Reply, HttpError> {
//!     Ok(Reply::new(pet))
//! }
//! ```

pub use crate::app::ApiApp;
pub use crate::auth::{AuthRequirement, AuthScheme};
pub use crate::config::ApiConfig;
pub use crate::error::{abort, BuildError, HttpError};
pub use crate::fields;
pub use crate::http::{Json, Router, StatusCode};
pub use crate::pagination::{pagination_builder, Pagination, RequestUrl};
pub use crate::pipeline::{
    CookieArgs, FileBody, FormBody, HeaderArgs, JsonBody, JsonOrFormBody, PathArgs, QueryArgs,
    Reply, UploadedFile,
};
pub use crate::plugin::Plugin;
pub use crate::route::{Doc, InputSpec, Location, OutputSpec, ResponseDoc, Route, RouteGroup};
pub use crate::schema::{empty_schema, file_schema, ApiSchema, Schema, SchemaRef, Unknown};
pub use crate::settings::ApiSettings;
pub use crate::validate;
