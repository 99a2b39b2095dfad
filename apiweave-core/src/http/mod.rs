//! Re-exports of the Axum/`http` types used across apiweave, so downstream
//! crates and applications can depend on a single path.

pub mod header;

pub use axum::body::{self, Body, Bytes};
pub use axum::handler::{self, Handler};
pub use axum::extract::{self, FromRef, FromRequest, FromRequestParts, Request, State};
pub use axum::middleware::{self, Next};
pub use axum::response::{self, Html, IntoResponse, Response};
pub use axum::routing::{self, MethodFilter, MethodRouter};
pub use axum::{serve, Extension, Json, Router};
pub use axum::http::Uri;
pub use self::header::{
    HeaderMap, HeaderName, HeaderValue, Method, Parts, StatusCode,
    // Common header constants
    ALLOW, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, LOCATION, WWW_AUTHENTICATE,
};
