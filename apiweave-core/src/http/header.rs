pub use axum::http::header::{
    HeaderName, HeaderValue,
    // Common header constants
    ALLOW, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, LOCATION, WWW_AUTHENTICATE,
};
pub use axum::http::request::Parts;
pub use axum::http::{HeaderMap, Method, StatusCode};
