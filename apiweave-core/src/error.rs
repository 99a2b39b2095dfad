use serde_json::{Map, Value};

use crate::http::response::{IntoResponse, Response};
use crate::http::{HeaderMap, HeaderName, HeaderValue, Json, StatusCode};
use crate::schema::FieldErrors;
use crate::settings::ApiSettings;

/// Return the canonical reason phrase for `code`, or `default` when the code
/// is not a known HTTP status.
///
/// ```
/// use apiweave_core::error::reason_phrase;
///
/// assert_eq!(reason_phrase(404, "Unknown"), "Not Found");
/// assert_eq!(reason_phrase(999, "Unknown"), "Unknown");
/// ```
pub fn reason_phrase(code: u16, default: &str) -> String {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or(default)
        .to_string()
}

/// Raised by [`HttpError::from_code`] for codes outside `400..=599`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatusCode(pub u16);

impl std::fmt::Display for UnknownStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No error for status code {}, valid error status codes are 4XX and 5XX",
            self.0
        )
    }
}

impl std::error::Error for UnknownStatusCode {}

/// The error that ends request handling with a JSON error response.
///
/// Every failure surfaced to a client (validation, authentication, explicit
/// aborts, framework 404/405) is rendered through this type, so the body
/// always has the shape `{"message": ..., "detail": ..., ...extra_data}`.
///
/// ```ignore
/// async fn get_pet(PathArgs(args): PathArgs<PetId>) -> Result<Reply, HttpError> {
///     let pet = store.find(args.id).ok_or_else(|| HttpError::not_found("This pet is missing."))?;
///     Ok(Reply::new(pet))
/// }
/// ```
#[derive(Clone)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Value,
    pub headers: HeaderMap,
    pub extra_data: Map<String, Value>,
}

impl HttpError {
    /// Create an error with the reason phrase of `status` as message.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: default_message(status),
            detail: Value::Object(Map::new()),
            headers: HeaderMap::new(),
            extra_data: Map::new(),
        }
    }

    /// Create an error from a raw status code, rejecting anything that is
    /// not a 4XX or 5XX code.
    pub fn from_code(code: u16) -> Result<Self, UnknownStatusCode> {
        if !(400..=599).contains(&code) {
            return Err(UnknownStatusCode(code));
        }
        let status = StatusCode::from_u16(code).map_err(|_| UnknownStatusCode(code))?;
        Ok(Self::new(status))
    }

    /// Set the message. `None` restores the reason phrase of the status code.
    pub fn message<M: Into<String>>(mut self, message: Option<M>) -> Self {
        self.message = match message {
            Some(m) => m.into(),
            None => default_message(self.status),
        };
        self
    }

    pub fn detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Add a response header. Invalid header names or values are dropped
    /// with a warning rather than turning the error into a panic.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "Dropping invalid error response header"),
        }
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Add a top-level member to the error body.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_data.insert(key.into(), value.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST).message(Some(message))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED).message(Some(message))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN).message(Some(message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND).message(Some(message))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT).message(Some(message))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR).message(Some(message))
    }

    /// The JSON body of this error. `extra_data` never overrides
    /// `message` or `detail`.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        for (key, value) in &self.extra_data {
            body.insert(key.clone(), value.clone());
        }
        body.insert("message".into(), Value::String(self.message.clone()));
        body.insert("detail".into(), self.detail.clone());
        Value::Object(body)
    }

    /// Render with the default JSON envelope.
    pub fn render(&self) -> Response {
        let mut response = (self.status, Json(self.body())).into_response();
        for (name, value) in &self.headers {
            response.headers_mut().insert(name.clone(), value.clone());
        }
        response
    }
}

fn default_message(status: StatusCode) -> String {
    reason_phrase(status.as_u16(), "Unknown error")
}

/// Shortcut for returning an error from a handler with `?`-free control flow.
///
/// ```ignore
/// if name == "Foo" {
///     return abort(404, Some("This man is missing."));
/// }
/// ```
pub fn abort<T>(code: u16, message: Option<&str>) -> Result<T, HttpError> {
    let error = HttpError::from_code(code)
        .unwrap_or_else(|e| HttpError::internal(e.to_string()));
    Err(error.message(message))
}

/// Marker stored in response extensions so the application-level renderer
/// can recognise (and re-render) responses produced from an [`HttpError`].
#[derive(Clone)]
pub struct RenderedError(pub HttpError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = self.render();
        response.extensions_mut().insert(RenderedError(self));
        response
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::fmt::Debug for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpError")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("detail", &self.detail)
            .finish()
    }
}

impl std::error::Error for HttpError {}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        HttpError::internal(err.to_string())
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::internal(err.to_string())
    }
}

/// Generate `From<E> for HttpError` implementations that map error types to
/// a status code, using the error's `Display` output as message.
///
/// ```ignore
/// apiweave_core::map_error! {
///     std::num::ParseIntError => BAD_REQUEST,
///     MyStoreError => INTERNAL_SERVER_ERROR,
/// }
/// ```
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $status:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::HttpError {
                fn from(err: $err_ty) -> Self {
                    $crate::HttpError::new($crate::http::StatusCode::$status)
                        .message(Some(err.to_string()))
                }
            }
        )*
    };
}

/// A configuration defect detected while assembling the application.
///
/// These never happen per request: [`ApiApp::build`](crate::app::ApiApp::build)
/// returns them before the router exists.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// A route declared more than one body input (json/form/files/json_or_form).
    MultipleBodyInputs { route: String },
    /// A route declared two inputs for the same location.
    DuplicateInputLocation { route: String, location: String },
    /// Two routes share a method and path.
    DuplicateRoute { method: String, path: String },
    /// A route path does not start with `/`.
    InvalidPath { path: String },
    /// Two paths differ only in parameter names (`/pets/{id}`, `/pets/{pet_id}`).
    ConflictingPaths { path: String, existing: String },
    /// A schema variant that cannot validate requests was used as an input.
    UnsupportedInputSchema { route: String },
    /// Raised by a plugin (e.g. spec construction).
    Plugin { plugin: &'static str, message: String },
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::MultipleBodyInputs { route } => write!(
                f,
                "{route}: only one request body location (json, form, files, json_or_form) can be declared"
            ),
            BuildError::DuplicateInputLocation { route, location } => {
                write!(f, "{route}: input location '{location}' declared more than once")
            }
            BuildError::DuplicateRoute { method, path } => {
                write!(f, "route {method} {path} registered more than once")
            }
            BuildError::InvalidPath { path } => {
                write!(f, "route path '{path}' must start with '/'")
            }
            BuildError::ConflictingPaths { path, existing } => write!(
                f,
                "route path '{path}' conflicts with '{existing}': parameter names must match"
            ),
            BuildError::UnsupportedInputSchema { route } => write!(
                f,
                "{route}: input schemas must be field schemas, not raw, empty or file schemas"
            ),
            BuildError::Plugin { plugin, message } => write!(f, "{plugin}: {message}"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Input validation failures of one request, keyed by location
/// (`json`, `query`, `form`, `files`, `path`, `headers`, `cookies`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationError {
    detail: Map<String, Value>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single location failing with `errors`.
    pub fn at(location: &str, errors: FieldErrors) -> Self {
        let mut error = Self::new();
        error.add(location, errors);
        error
    }

    pub fn add(&mut self, location: &str, errors: FieldErrors) {
        self.detail.insert(location.to_string(), errors.into_value());
    }

    pub fn is_empty(&self) -> bool {
        self.detail.is_empty()
    }

    pub fn detail(&self) -> &Map<String, Value> {
        &self.detail
    }

    /// Convert with the configured status code and message.
    pub fn into_http_error(self, settings: &ApiSettings) -> HttpError {
        let status = StatusCode::from_u16(settings.validation_error_status_code)
            .unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
        HttpError::new(status)
            .message(Some(settings.validation_error_description.clone()))
            .detail(Value::Object(self.detail))
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let locations: Vec<&str> = self.detail.keys().map(String::as_str).collect();
        write!(f, "validation failed in {}", locations.join(", "))
    }
}

impl std::error::Error for ValidationError {}
