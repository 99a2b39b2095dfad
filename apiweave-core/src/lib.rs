//! Core of apiweave: declarative schemas, the validating request/response
//! pipeline, JSON errors and the application builder on top of Axum.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod fields;
pub mod http;
pub mod layers;
pub mod meta;
pub mod pagination;
pub mod pipeline;
pub mod plugin;
pub mod prelude;
pub mod route;
pub mod schema;
pub mod settings;
pub mod validate;

pub use app::{ApiApp, ErrorProcessor};
pub use auth::{AuthOutcome, AuthRequirement, AuthScheme};
pub use config::{ApiConfig, ConfigError, ConfigValue, FromConfigValue};
pub use error::{abort, reason_phrase, BuildError, HttpError, RenderedError, ValidationError};
pub use layers::{default_trace, init_tracing, init_tracing_json};
pub use meta::MetaRegistry;
pub use pagination::{pagination_builder, Pagination, PaginationPayload, RequestUrl};
pub use pipeline::{
    CookieArgs, FileBody, FormBody, HeaderArgs, JsonBody, JsonOrFormBody, PathArgs, QueryArgs,
    Reply, UploadedFile, ValidatedInputs,
};
pub use plugin::Plugin;
pub use route::{Doc, GroupInfo, InputSpec, Location, OutputSpec, ResponseDoc, Route, RouteGroup, RouteMeta};
pub use schema::{ApiSchema, Schema, SchemaRef, Unknown};
pub use settings::ApiSettings;
