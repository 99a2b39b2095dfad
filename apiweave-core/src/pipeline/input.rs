use std::collections::HashMap;

use bytes::Bytes;
use serde_json::{json, Map, Value};

use super::multipart::collect_multipart;
use super::{RouteContext, ValidatedInputs};
use crate::error::{HttpError, ValidationError};
use crate::http::body::{self, Body};
use crate::http::extract::RawPathParams;
use crate::http::{FromRequestParts, HeaderMap, Parts, StatusCode, CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use crate::route::{InputSpec, Location};
use crate::schema::Schema;

/// Read, parse and validate every declared input.
///
/// On success the validated data is stored in the request extensions and
/// the (buffered) body is handed back for the handler. All locations are
/// checked before failing, so one response reports every invalid location.
pub(crate) async fn validate_inputs(
    ctx: &RouteContext,
    parts: &mut Parts,
    body: Body,
) -> Result<Body, HttpError> {
    let meta = &ctx.meta;
    if meta.inputs.is_empty() {
        return Ok(body);
    }

    let mut validated = ValidatedInputs::default();
    let mut errors = ValidationError::new();
    let mut body = body;

    for spec in &meta.inputs {
        let (location, raw) = if spec.location.is_body() {
            let bytes = read_body(std::mem::take(&mut body), &parts.headers, ctx.settings.body_limit).await?;
            let parsed = parse_body(spec, &parts.headers, bytes.clone()).await?;
            body = Body::from(bytes);
            parsed
        } else {
            (spec.location.as_str(), read_location(spec, parts).await)
        };
        load_input(spec, location, raw, &mut validated, &mut errors);
    }

    if !errors.is_empty() {
        tracing::debug!(
            route = %format!("{} {}", meta.method, meta.path),
            locations = errors.detail().len(),
            "Request validation failed"
        );
        return Err(errors.into_http_error(&ctx.settings));
    }
    parts.extensions.insert(validated);
    Ok(body)
}

fn load_input(
    spec: &InputSpec,
    location: &str,
    raw: Value,
    validated: &mut ValidatedInputs,
    errors: &mut ValidationError,
) {
    let schema = match spec.schema.schema() {
        Some(schema) if spec.validation => schema,
        _ => {
            validated.insert(spec.location, raw);
            return;
        }
    };
    match schema.load_value(&raw, spec.location.default_unknown()) {
        Ok(data) => validated.insert(spec.location, data),
        Err(field_errors) => errors.add(location, field_errors),
    }
}

fn payload_too_large() -> HttpError {
    HttpError::new(StatusCode::PAYLOAD_TOO_LARGE)
}

async fn read_body(body: Body, headers: &HeaderMap, limit: usize) -> Result<Bytes, HttpError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(payload_too_large());
    }
    body::to_bytes(body, limit).await.map_err(|err| {
        let inner = err.into_inner();
        if inner.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
            payload_too_large()
        } else {
            HttpError::bad_request("Failed to read request body.")
        }
    })
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default()
}

fn is_json(content_type: &str) -> bool {
    content_type == "application/json" || content_type.ends_with("+json")
}

async fn parse_body(
    spec: &InputSpec,
    headers: &HeaderMap,
    bytes: Bytes,
) -> Result<(&'static str, Value), HttpError> {
    let schema = spec.schema.schema().map(|s| s.as_ref());
    let ct = content_type(headers);
    match spec.location {
        Location::Form => Ok(("form", parse_form(&bytes, schema))),
        Location::Files => Ok((
            "files",
            Value::Object(collect_multipart(headers, bytes, schema).await?),
        )),
        Location::JsonOrForm if ct == "application/x-www-form-urlencoded" => {
            Ok(("form", parse_form(&bytes, schema)))
        }
        _ => Ok(("json", parse_json(&bytes, &ct)?)),
    }
}

fn parse_json(bytes: &Bytes, content_type: &str) -> Result<Value, HttpError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    if !content_type.is_empty() && !is_json(content_type) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|_| {
        HttpError::bad_request("Bad Request").detail(json!({ "json": ["Invalid JSON body."] }))
    })
}

/// Multi-valued `key=value` pairs into an object: keys of list fields keep
/// every value, other keys keep the first.
fn pairs_to_object<I>(pairs: I, schema: Option<&Schema>) -> Value
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in pairs {
        match grouped.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => grouped.push((key, vec![value])),
        }
    }
    let mut out = Map::new();
    for (key, mut values) in grouped {
        let is_list = schema
            .and_then(|s| s.fields().iter().find(|(n, f)| f.external_key(n) == key))
            .is_some_and(|(_, f)| f.is_list());
        let value = if is_list {
            Value::Array(values.into_iter().map(Value::String).collect())
        } else {
            Value::String(values.swap_remove(0))
        };
        out.insert(key, value);
    }
    Value::Object(out)
}

fn parse_form(bytes: &Bytes, schema: Option<&Schema>) -> Value {
    pairs_to_object(
        form_urlencoded::parse(bytes).map(|(k, v)| (k.into_owned(), v.into_owned())),
        schema,
    )
}

fn parse_query(query: Option<&str>, schema: Option<&Schema>) -> Value {
    pairs_to_object(
        form_urlencoded::parse(query.unwrap_or("").as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned())),
        schema,
    )
}

async fn read_location(spec: &InputSpec, parts: &mut Parts) -> Value {
    let schema = spec.schema.schema().map(|s| s.as_ref());
    match spec.location {
        Location::Query => parse_query(parts.uri.query(), schema),
        Location::Path => {
            let mut out = Map::new();
            if let Ok(params) = RawPathParams::from_request_parts(parts, &()).await {
                for (key, value) in &params {
                    out.insert(key.to_string(), Value::String(value.to_string()));
                }
            }
            Value::Object(out)
        }
        Location::Headers => read_headers(&parts.headers, schema),
        Location::Cookies => read_cookies(&parts.headers),
        _ => Value::Object(Map::new()),
    }
}

/// Headers matching the schema's fields. `X-Request-Id` matches a field
/// keyed `x_request_id` or `X-Request-Id`.
fn read_headers(headers: &HeaderMap, schema: Option<&Schema>) -> Value {
    let mut out = Map::new();
    let Some(schema) = schema else {
        for (name, value) in headers {
            if let Ok(value) = value.to_str() {
                out.entry(name.as_str().to_string())
                    .or_insert_with(|| Value::String(value.to_string()));
            }
        }
        return Value::Object(out);
    };
    for (name, field) in schema.fields() {
        let key = field.external_key(name);
        let header_name = key.replace('_', "-").to_ascii_lowercase();
        let values: Vec<Value> = headers
            .get_all(header_name.as_str())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|v| Value::String(v.to_string()))
            .collect();
        if values.is_empty() {
            continue;
        }
        let value = if field.is_list() {
            Value::Array(values)
        } else {
            values.into_iter().next().unwrap_or(Value::Null)
        };
        out.insert(key.to_string(), value);
    }
    Value::Object(out)
}

pub(crate) fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for pair in header.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                cookies
                    .entry(name.trim().to_string())
                    .or_insert_with(|| value.trim().trim_matches('"').to_string());
            }
        }
    }
    cookies
}

fn read_cookies(headers: &HeaderMap) -> Value {
    Value::Object(
        parse_cookies(headers)
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::http::HeaderValue;

    #[test]
    fn list_fields_collect_repeated_keys() {
        let schema = Schema::inline()
            .field("tag", fields::list(fields::string()))
            .field("page", fields::integer());
        let value = parse_query(Some("tag=a&tag=b&page=2&page=3"), Some(&schema));
        assert_eq!(value, json!({"tag": ["a", "b"], "page": "2"}));
    }

    #[test]
    fn headers_match_field_names_loosely() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        let schema = Schema::inline().field("x_request_id", fields::string());
        assert_eq!(
            read_headers(&headers, Some(&schema)),
            json!({"x_request_id": "abc"})
        );
    }

    #[test]
    fn cookies_are_split_into_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session=abc; theme=\"dark\""));
        let cookies = parse_cookies(&headers);
        assert_eq!(cookies["session"], "abc");
        assert_eq!(cookies["theme"], "dark");
    }

    #[test]
    fn invalid_json_is_a_bad_request() {
        let err = parse_json(&Bytes::from_static(b"{nope"), "application/json").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.detail, json!({"json": ["Invalid JSON body."]}));
    }

    #[test]
    fn empty_or_foreign_bodies_load_as_empty_objects() {
        assert_eq!(parse_json(&Bytes::new(), "application/json").unwrap(), json!({}));
        assert_eq!(parse_json(&Bytes::from_static(b"a=1"), "text/plain").unwrap(), json!({}));
    }
}
