use std::future::Future;

use serde::Serialize;
use serde_json::Value;

use super::RouteContext;
use crate::error::HttpError;
use crate::http::body::Body;
use crate::http::response::{IntoResponse, Response};
use crate::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, CONTENT_LENGTH, CONTENT_TYPE};
use crate::schema::SchemaRef;

/// A handler's successful result, shaped by the route's output schema.
///
/// ```ignore
/// async fn create_pet(JsonBody(pet): JsonBody<PetIn>) -> Reply {
///     Reply::new(store.insert(pet))            // route default status
/// }
///
/// async fn update_pet(..) -> Reply {
///     Reply::from((pet, 202))                  // explicit status wins
/// }
///
/// async fn delete_pet(..) -> (StatusCode, Reply) {
///     (StatusCode::NO_CONTENT, Reply::empty())
/// }
/// ```
///
/// Status resolution: an explicit [`Reply::status`] wins, then a status set
/// around the reply (e.g. a `(StatusCode, Reply)` tuple, `200` included),
/// then the route's declared success status.
#[derive(Debug, Clone)]
pub struct Reply {
    body: Result<Value, String>,
    status: Option<StatusCode>,
    headers: HeaderMap,
}

/// The unshaped reply, carried in the response extensions until the route
/// pipeline renders it.
#[derive(Debug, Clone)]
pub(crate) struct PendingReply(pub(crate) Reply);

tokio::task_local! {
    static IN_PIPELINE: ();
}

/// Inside the pipeline a reply without a status renders with this code, so
/// [`finish`] can tell it apart from any status a handler sets around it.
const UNSET_STATUS: u16 = 999;

fn unset_status() -> StatusCode {
    StatusCode::from_u16(UNSET_STATUS).unwrap_or(StatusCode::OK)
}

/// Run a route's handler chain so that its replies defer their status.
pub(crate) async fn in_pipeline<F: Future>(handler: F) -> F::Output {
    IN_PIPELINE.scope((), handler).await
}

impl Reply {
    pub fn new<T: Serialize>(body: T) -> Self {
        Self {
            body: serde_json::to_value(body).map_err(|e| e.to_string()),
            status: None,
            headers: HeaderMap::new(),
        }
    }

    /// A reply without a body, typically for `204 No Content`.
    pub fn empty() -> Self {
        Self::new(Value::Null)
    }

    pub fn status(mut self, status: u16) -> Self {
        match StatusCode::from_u16(status) {
            Ok(status) => self.status = Some(status),
            Err(_) => self.body = Err(format!("invalid status code {status}")),
        }
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = name, "Dropping invalid reply header"),
        }
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref().ok()
    }
}

impl<T: Serialize> From<(T, u16)> for Reply {
    fn from((body, status): (T, u16)) -> Self {
        Reply::new(body).status(status)
    }
}

impl<T: Serialize> From<(T, HeaderMap)> for Reply {
    fn from((body, headers): (T, HeaderMap)) -> Self {
        Reply::new(body).headers(headers)
    }
}

impl<T: Serialize> From<(T, u16, HeaderMap)> for Reply {
    fn from((body, status, headers): (T, u16, HeaderMap)) -> Self {
        Reply::new(body).status(status).headers(headers)
    }
}

impl IntoResponse for Reply {
    /// Renders as plain JSON, so a `Reply` also works on routes mounted
    /// outside the application builder. The route pipeline re-renders it.
    fn into_response(self) -> Response {
        let status = match self.status {
            Some(status) => status,
            None if IN_PIPELINE.try_with(|_| ()).is_ok() => unset_status(),
            None => StatusCode::OK,
        };
        let rendered = self
            .body
            .clone()
            .map_err(serialization_failed)
            .and_then(|body| render(body, status, "application/json"));
        let mut response = match rendered {
            Ok(response) => response,
            Err(error) => return error.into_response(),
        };
        response.headers_mut().extend(self.headers.clone());
        response.extensions_mut().insert(PendingReply(self));
        response
    }
}

fn serialization_failed(message: String) -> HttpError {
    tracing::error!(error = %message, "Failed to serialize reply");
    HttpError::internal("Internal Server Error")
}

fn render(body: Value, status: StatusCode, content_type: &str) -> Result<Response, HttpError> {
    if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = status;
        return Ok(response);
    }
    let is_json = content_type.contains("json");
    let (bytes, content_type) = match body {
        Value::String(text) if !is_json => (text.into_bytes(), content_type.to_string()),
        other => (
            serde_json::to_vec(&other)?,
            if is_json {
                content_type.to_string()
            } else {
                "application/json".to_string()
            },
        ),
    };
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    Ok(response)
}

/// Render a pending reply through the route's output schema and the
/// application's base-response envelope.
pub(crate) fn finish(ctx: &RouteContext, mut response: Response) -> Response {
    let Some(PendingReply(reply)) = response.extensions_mut().remove::<PendingReply>() else {
        return response;
    };
    let meta = &ctx.meta;
    let around = response.status();
    let status = reply
        .status
        .or_else(|| (around != unset_status()).then_some(around))
        .unwrap_or_else(|| meta.success_status());

    let output = meta.output.as_ref();
    let schema = output.map(|o| &o.schema);
    let content_type = output
        .map(|o| o.content_type.as_str())
        .unwrap_or("application/json");

    let rendered = reply
        .body
        .map_err(serialization_failed)
        .and_then(|body| shape(ctx, schema, body, status))
        .and_then(|body| render(body, status, content_type));
    let rendered = match rendered {
        Ok(rendered) => rendered,
        Err(error) => return error.into_response(),
    };

    let (mut parts, _) = response.into_parts();
    let (rendered_parts, body) = rendered.into_parts();
    parts.status = status;
    parts.headers.remove(CONTENT_LENGTH);
    parts.headers.remove(CONTENT_TYPE);
    if let Some(ct) = rendered_parts.headers.get(CONTENT_TYPE) {
        parts.headers.insert(CONTENT_TYPE, ct.clone());
    }
    Response::from_parts(parts, body)
}

fn shape(
    ctx: &RouteContext,
    schema: Option<&SchemaRef>,
    body: Value,
    status: StatusCode,
) -> Result<Value, HttpError> {
    let dump = |value: &Value| match schema {
        Some(schema) => schema.dump(value),
        None => value.clone(),
    };
    let settings = &ctx.settings;
    let Some(base) = &settings.base_response_schema else {
        return Ok(dump(&body));
    };
    if ctx.meta.success_status() == StatusCode::NO_CONTENT || status == StatusCode::NO_CONTENT {
        return Ok(body);
    }
    let key = settings.base_response_data_key.as_str();
    let Value::Object(mut envelope) = body else {
        return Err(missing_data_key(ctx, key));
    };
    let Some(data) = envelope.get(key) else {
        return Err(missing_data_key(ctx, key));
    };
    let data = dump(data);
    envelope.insert(key.to_string(), data.clone());
    let mut wrapped = base.dump_value(&Value::Object(envelope));
    if let Value::Object(map) = &mut wrapped {
        map.insert(key.to_string(), data);
    }
    Ok(wrapped)
}

fn missing_data_key(ctx: &RouteContext, key: &str) -> HttpError {
    tracing::error!(
        route = %format!("{} {}", ctx.meta.method, ctx.meta.path),
        data_key = key,
        "Reply body lacks the base response data key"
    );
    HttpError::internal("Internal Server Error")
}
