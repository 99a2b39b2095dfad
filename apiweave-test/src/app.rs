use apiweave_core::http::body::Body;
use apiweave_core::http::Router;
use apiweave_core::ApiApp;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tower::util::ServiceExt;

use crate::json_path::JsonPath;
use crate::multipart::MultipartForm;

/// Drives an assembled application in-process.
///
/// Each request is a `oneshot` call on a clone of the router, so every
/// middleware the app installs (error rendering, tracing, panic catching)
/// takes part without a socket.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// # Panics
    ///
    /// Panics with the [`BuildError`](apiweave_core::BuildError) if the app
    /// does not assemble.
    pub fn from_app<S: Clone + Send + Sync + 'static>(app: ApiApp<S>) -> Self {
        app.build()
            .map(Self::new)
            .unwrap_or_else(|err| panic!("cannot build app under test: {err}"))
    }

    pub fn request(&self, method: Method, path: &str) -> TestRequest<'_> {
        TestRequest {
            app: self,
            method,
            uri: path.to_owned(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::DELETE, path)
    }
}

/// Builder for one request against a [`TestApp`].
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| panic!("invalid header value {value:?}"))
}

impl TestRequest<'_> {
    /// Appends a header; repeated names are kept.
    pub fn header(mut self, name: impl header::IntoHeaderName, value: impl AsRef<str>) -> Self {
        self.headers.append(name, header_value(value.as_ref()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header(header::AUTHORIZATION, format!("Bearer {token}"))
    }

    pub fn basic(self, username: &str, password: &str) -> Self {
        let pair = STANDARD.encode(format!("{username}:{password}"));
        self.header(header::AUTHORIZATION, format!("Basic {pair}"))
    }

    pub fn cookie(self, name: &str, value: &str) -> Self {
        self.header(header::COOKIE, format!("{name}={value}"))
    }

    /// Raw body. No content type is set.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    fn typed_body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.headers
            .insert(header::CONTENT_TYPE, header_value(content_type));
        self.body(body)
    }

    pub fn json(self, body: &impl Serialize) -> Self {
        let bytes = serde_json::to_vec(body)
            .unwrap_or_else(|e| panic!("request body is not serializable: {e}"));
        self.typed_body("application/json", bytes)
    }

    pub fn form(self, pairs: &[(&str, &str)]) -> Self {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.typed_body("application/x-www-form-urlencoded", encoded)
    }

    pub fn multipart(self, form: MultipartForm) -> Self {
        let content_type = form.content_type();
        self.typed_body(&content_type, form.into_body())
    }

    pub async fn send(self) -> TestResponse {
        let mut request = Request::new(Body::from(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = self
            .uri
            .parse()
            .unwrap_or_else(|e| panic!("invalid request uri {:?}: {e}", self.uri));
        *request.headers_mut() = self.headers;
        request
            .headers_mut()
            .entry(header::HOST)
            .or_insert(HeaderValue::from_static("localhost"));

        let response = match self.app.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        };
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .unwrap_or_else(|e| panic!("response body could not be read: {e}"))
            .to_bytes();

        TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

/// Status, headers and buffered body of a response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

macro_rules! status_assertions {
    ($($name:ident => $status:ident),* $(,)?) => {
        $(
            pub fn $name(self) -> Self {
                self.assert_status(StatusCode::$status)
            }
        )*
    };
}

impl TestResponse {
    status_assertions! {
        assert_ok => OK,
        assert_created => CREATED,
        assert_no_content => NO_CONTENT,
        assert_bad_request => BAD_REQUEST,
        assert_unauthorized => UNAUTHORIZED,
        assert_forbidden => FORBIDDEN,
        assert_not_found => NOT_FOUND,
        assert_unprocessable => UNPROCESSABLE_ENTITY,
    }

    pub fn assert_status(self, expected: impl Into<u16>) -> Self {
        let expected = expected.into();
        if self.status.as_u16() != expected {
            panic!(
                "status {} (expected {expected})\n{}",
                self.status,
                self.text()
            );
        }
        self
    }

    /// `path` uses dotted keys, `[i]` indices and a trailing `len()`:
    ///
    /// ```ignore
    /// resp.assert_json_path("detail.json.name[0]", "Missing data for required field.")
    ///     .assert_json_path("pets.len()", 2);
    /// ```
    pub fn assert_json_path(self, path: &str, expected: impl Into<Value>) -> Self {
        let expected = expected.into();
        let (root, found) = self.lookup(path);
        assert!(
            found == expected,
            "`{path}` is {found}, expected {expected}\nin {root}"
        );
        self
    }

    pub fn assert_json_path_fn(self, path: &str, check: impl FnOnce(&Value) -> bool) -> Self {
        let (root, found) = self.lookup(path);
        assert!(check(&found), "`{path}` = {found} rejected\nin {root}");
        self
    }

    pub fn assert_header(self, name: &str, expected: &str) -> Self {
        let found = self.header(name);
        assert!(
            found == Some(expected),
            "header `{name}` is {found:?}, expected {expected:?}"
        );
        self
    }

    pub fn json_path<T: DeserializeOwned>(&self, path: &str) -> T {
        let (root, found) = self.lookup(path);
        T::deserialize(&found)
            .unwrap_or_else(|e| panic!("`{path}` = {found} does not deserialize: {e}\nin {root}"))
    }

    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = HeaderName::try_from(name.as_ref()).ok()?;
        self.headers.get(&name)?.to_str().ok()
    }

    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("body is not the expected JSON ({e}):\n{}", self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn lookup(&self, path: &str) -> (Value, Value) {
        let root: Value = self.json();
        let found = JsonPath::parse(path).lookup(&root);
        (root, found)
    }
}
