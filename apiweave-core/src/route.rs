//! Route declarations: the handler plus everything declared about its
//! inputs, output, authentication and documentation.
//!
//! Builder calls can come in any order; they accumulate into one [`Route`]
//! that is frozen into a [`RouteMeta`] when registered on the application.
//!
//! ```ignore
//! Route::post("/pets", create_pet)
//!     .doc(Doc::new().summary("Create a pet").tags(["Pets"]))
//!     .output(PetOut::schema(), 201)
//!     .input(PetIn::schema(), Location::Json)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::auth::{AuthRequirement, AuthScheme};
use crate::error::BuildError;
use crate::http::handler::Handler;
use crate::http::routing::{self, MethodRouter};
use crate::http::{Method, StatusCode};
use crate::schema::{SchemaRef, Unknown};

/// Where an input is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    Json,
    Query,
    Form,
    Files,
    /// JSON or url-encoded form, chosen by the request's content type.
    JsonOrForm,
    Path,
    Headers,
    Cookies,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Json => "json",
            Location::Query => "query",
            Location::Form => "form",
            Location::Files => "files",
            Location::JsonOrForm => "json_or_form",
            Location::Path => "path",
            Location::Headers => "headers",
            Location::Cookies => "cookies",
        }
    }

    /// Whether the input comes from the request body.
    pub fn is_body(&self) -> bool {
        matches!(
            self,
            Location::Json | Location::Form | Location::Files | Location::JsonOrForm
        )
    }

    /// Policy for keys that match no field: bodies reject them, everything
    /// else (query strings, headers, ...) carries unrelated keys routinely.
    pub fn default_unknown(&self) -> Unknown {
        if matches!(self, Location::Json | Location::Form | Location::JsonOrForm) {
            Unknown::Raise
        } else {
            Unknown::Exclude
        }
    }

    /// Request body media types accepted for this location.
    pub fn content_types(&self) -> &'static [&'static str] {
        match self {
            Location::Json => &["application/json"],
            Location::Form => &["application/x-www-form-urlencoded"],
            Location::Files => &["multipart/form-data"],
            Location::JsonOrForm => &["application/json", "application/x-www-form-urlencoded"],
            _ => &[],
        }
    }

    /// The OpenAPI `in` of parameters read from this location.
    pub fn parameter_in(&self) -> Option<&'static str> {
        match self {
            Location::Query => Some("query"),
            Location::Path => Some("path"),
            Location::Headers => Some("header"),
            Location::Cookies => Some("cookie"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared input.
#[derive(Clone, Debug)]
pub struct InputSpec {
    pub schema: SchemaRef,
    pub location: Location,
    pub example: Option<Value>,
    pub examples: Option<Map<String, Value>>,
    /// When false the raw location data reaches the handler unvalidated.
    pub validation: bool,
    pub description: Option<String>,
}

impl InputSpec {
    pub fn new(schema: impl Into<SchemaRef>, location: Location) -> Self {
        Self {
            schema: schema.into(),
            location,
            example: None,
            examples: None,
            validation: true,
            description: None,
        }
    }

    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn examples(mut self, examples: Map<String, Value>) -> Self {
        self.examples = Some(examples);
        self
    }

    pub fn validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Give an inline schema a component name.
    pub fn schema_name(mut self, name: impl Into<String>) -> Self {
        if let SchemaRef::Inline(schema) = &self.schema {
            let renamed = schema.as_ref().clone().rename(name);
            self.schema = SchemaRef::Named(Arc::new(renamed));
        }
        self
    }
}

/// The declared success response.
#[derive(Clone, Debug)]
pub struct OutputSpec {
    pub schema: SchemaRef,
    pub status: StatusCode,
    pub description: Option<String>,
    pub content_type: String,
    pub example: Option<Value>,
    pub examples: Option<Map<String, Value>>,
    pub links: Option<Map<String, Value>>,
    pub headers: Option<SchemaRef>,
}

impl OutputSpec {
    pub fn new(schema: impl Into<SchemaRef>) -> Self {
        Self {
            schema: schema.into(),
            status: StatusCode::OK,
            description: None,
            content_type: "application/json".to_string(),
            example: None,
            examples: None,
            links: None,
            headers: None,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn examples(mut self, examples: Map<String, Value>) -> Self {
        self.examples = Some(examples);
        self
    }

    pub fn links(mut self, links: Map<String, Value>) -> Self {
        self.links = Some(links);
        self
    }

    /// Schema of the response headers.
    pub fn headers(mut self, headers: impl Into<SchemaRef>) -> Self {
        self.headers = Some(headers.into());
        self
    }
}

/// Documentation of an extra response listed with [`Doc::response`].
#[derive(Clone, Debug, Default)]
pub struct ResponseDoc {
    pub description: Option<String>,
    pub schema: Option<SchemaRef>,
    pub content_type: Option<String>,
    pub example: Option<Value>,
}

impl ResponseDoc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }
}

impl From<&str> for ResponseDoc {
    fn from(description: &str) -> Self {
        ResponseDoc::new().description(description)
    }
}

impl From<String> for ResponseDoc {
    fn from(description: String) -> Self {
        ResponseDoc::new().description(description)
    }
}

/// Documentation-only metadata. Nothing here changes request handling.
#[derive(Clone, Debug, Default)]
pub struct Doc {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub responses: BTreeMap<u16, ResponseDoc>,
    pub deprecated: Option<bool>,
    pub hide: bool,
    pub operation_id: Option<String>,
    /// Security requirements by scheme name, with their scopes. Overrides
    /// the requirement derived from `auth_required`.
    pub security: Option<Vec<(String, Vec<String>)>>,
    pub extensions: Map<String, Value>,
}

impl Doc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Document an extra response: `.response(404, "Pet not found")`.
    pub fn response(mut self, status: u16, response: impl Into<ResponseDoc>) -> Self {
        self.responses.insert(status, response.into());
        self
    }

    /// Document several extra responses with their standard descriptions.
    pub fn responses<I: IntoIterator<Item = u16>>(mut self, statuses: I) -> Self {
        for status in statuses {
            self.responses.entry(status).or_default();
        }
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = Some(true);
        self
    }

    pub fn hide(mut self) -> Self {
        self.hide = true;
        self
    }

    pub fn operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// Require the named security scheme (no scopes).
    pub fn security(self, scheme: impl Into<String>) -> Self {
        self.security_scopes(scheme, Vec::<String>::new())
    }

    pub fn security_scopes<I, S>(mut self, scheme: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.security
            .get_or_insert_with(Vec::new)
            .push((scheme.into(), scopes.into_iter().map(Into::into).collect()));
        self
    }

    /// Add an `x-` extension to the operation. The prefix is added when missing.
    pub fn extension(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let name = if name.starts_with("x-") {
            name
        } else {
            format!("x-{name}")
        };
        self.extensions.insert(name, value.into());
        self
    }

    /// Fold `other` into this doc: scalars from `other` win, lists and maps
    /// accumulate.
    pub fn merge(mut self, other: Doc) -> Self {
        if other.summary.is_some() {
            self.summary = other.summary;
        }
        if other.description.is_some() {
            self.description = other.description;
        }
        for tag in other.tags {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self.responses.extend(other.responses);
        if other.deprecated.is_some() {
            self.deprecated = other.deprecated;
        }
        self.hide |= other.hide;
        if other.operation_id.is_some() {
            self.operation_id = other.operation_id;
        }
        if let Some(security) = other.security {
            self.security.get_or_insert_with(Vec::new).extend(security);
        }
        self.extensions.extend(other.extensions);
        self
    }
}

/// A handler with its accumulated declarations, before registration.
pub struct Route<S = ()> {
    method: Method,
    path: String,
    handler: MethodRouter<S>,
    name: String,
    inputs: Vec<InputSpec>,
    output: Option<OutputSpec>,
    auth: Option<AuthRequirement>,
    doc: Doc,
}

macro_rules! method_constructor {
    ($fn_name:ident, $method:ident) => {
        pub fn $fn_name<H, T>(path: &str, handler: H) -> Self
        where
            H: Handler<T, S>,
            T: 'static,
        {
            Self::with_method(
                Method::$method,
                path,
                routing::$fn_name(handler),
                handler_name::<H>(),
            )
        }
    };
}

impl<S> Route<S>
where
    S: Clone + Send + Sync + 'static,
{
    method_constructor!(get, GET);
    method_constructor!(post, POST);
    method_constructor!(put, PUT);
    method_constructor!(patch, PATCH);
    method_constructor!(delete, DELETE);

    fn with_method(method: Method, path: &str, handler: MethodRouter<S>, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| name_from_path(&method, path));
        Self {
            method,
            path: path.to_string(),
            handler,
            name,
            inputs: Vec::new(),
            output: None,
            auth: None,
            doc: Doc::default(),
        }
    }

    /// Validate the data at `location` against `schema` before the handler runs.
    pub fn input(self, schema: impl Into<SchemaRef>, location: Location) -> Self {
        self.input_with(InputSpec::new(schema, location))
    }

    pub fn input_with(mut self, spec: InputSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    /// Shape the handler's reply through `schema`, with `status` as the
    /// default success status.
    pub fn output(self, schema: impl Into<SchemaRef>, status: u16) -> Self {
        self.output_with(OutputSpec::new(schema).status(status))
    }

    pub fn output_with(mut self, spec: OutputSpec) -> Self {
        self.output = Some(spec);
        self
    }

    pub fn auth_required<A: AuthScheme + Clone>(self, auth: &A) -> Self {
        self.auth_required_with(AuthRequirement::new(auth.clone()))
    }

    pub fn auth_required_with(mut self, requirement: impl Into<AuthRequirement>) -> Self {
        self.auth = Some(requirement.into());
        self
    }

    pub fn doc(mut self, doc: Doc) -> Self {
        self.doc = std::mem::take(&mut self.doc).merge(doc);
        self
    }

    /// Endpoint name used for the automatic summary and operation id.
    /// Defaults to the handler function's name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check the declarations and split into metadata and the axum handler.
    pub(crate) fn freeze(
        self,
        prefix: &str,
        group: Option<&GroupInfo>,
    ) -> Result<(RouteMeta, MethodRouter<S>), BuildError> {
        let path = axum_path(&join_path(prefix, &self.path));
        if !path.starts_with('/') {
            return Err(BuildError::InvalidPath { path });
        }
        let route_id = format!("{} {}", self.method, path);

        let mut inputs = self.inputs;
        inputs.sort_by_key(|spec| spec.location);
        let mut body_count = 0;
        for (i, spec) in inputs.iter().enumerate() {
            if spec.location.is_body() {
                body_count += 1;
            }
            if inputs[..i].iter().any(|prev| prev.location == spec.location) {
                return Err(BuildError::DuplicateInputLocation {
                    route: route_id,
                    location: spec.location.to_string(),
                });
            }
            if spec.validation && spec.schema.schema().is_none() {
                return Err(BuildError::UnsupportedInputSchema { route: route_id });
            }
        }
        if body_count > 1 {
            return Err(BuildError::MultipleBodyInputs { route: route_id });
        }

        let meta = RouteMeta {
            method: self.method,
            path,
            name: self.name,
            inputs,
            output: self.output,
            auth: self.auth,
            doc: self.doc,
            group: group.cloned(),
        };
        Ok((meta, self.handler))
    }
}

/// The group a route was registered through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub name: String,
    pub tag: Option<String>,
}

impl GroupInfo {
    /// Tag used when automatic tagging is on: the explicit tag, else the
    /// group name title-cased.
    pub fn auto_tag(&self) -> String {
        self.tag.clone().unwrap_or_else(|| title_case(&self.name))
    }
}

/// Frozen metadata of one registered route. Shared read-only by the request
/// pipeline and the spec builder.
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub method: Method,
    /// Full path, group prefix included, in axum syntax.
    pub path: String,
    pub name: String,
    pub inputs: Vec<InputSpec>,
    pub output: Option<OutputSpec>,
    pub auth: Option<AuthRequirement>,
    pub doc: Doc,
    pub group: Option<GroupInfo>,
}

impl RouteMeta {
    pub fn input(&self, location: Location) -> Option<&InputSpec> {
        self.inputs.iter().find(|spec| spec.location == location)
    }

    pub fn body_input(&self) -> Option<&InputSpec> {
        self.inputs.iter().find(|spec| spec.location.is_body())
    }

    /// Status of the success response.
    pub fn success_status(&self) -> StatusCode {
        self.output
            .as_ref()
            .map(|output| output.status)
            .unwrap_or(StatusCode::OK)
    }

    /// `get_pet` becomes `Get Pet`.
    pub fn auto_summary(&self) -> String {
        title_case(&self.name)
    }

    pub fn auto_operation_id(&self) -> String {
        format!("{}_{}", self.method.as_str().to_lowercase(), self.name)
    }

    /// Names of the path parameters (`/pets/{id}` gives `id`).
    pub fn path_params(&self) -> Vec<String> {
        path_params(&self.path)
    }
}

/// A set of routes sharing a URL prefix and a tag.
pub struct RouteGroup<S = ()> {
    pub(crate) info: GroupInfo,
    pub(crate) prefix: String,
    pub(crate) routes: Vec<Route<S>>,
}

impl<S> RouteGroup<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: GroupInfo {
                name: name.into(),
                tag: None,
            },
            prefix: String::new(),
            routes: Vec::new(),
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.info.tag = Some(tag.into());
        self
    }

    pub fn route(mut self, route: Route<S>) -> Self {
        self.routes.push(route);
        self
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }
}

fn handler_name<H>() -> Option<String> {
    let full = std::any::type_name::<H>();
    let last = full.rsplit("::").next().unwrap_or(full);
    let valid = !last.is_empty()
        && last
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| last.to_string())
}

fn name_from_path(method: &Method, path: &str) -> String {
    let mut name = method.as_str().to_lowercase();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let segment = segment
            .trim_start_matches([':', '{', '*'])
            .trim_end_matches('}')
            .trim_start_matches('*');
        name.push('_');
        name.extend(
            segment
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }),
        );
    }
    name
}

pub(crate) fn title_case(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return if path.is_empty() { "/".to_string() } else { path.to_string() };
    }
    match path {
        "" | "/" => prefix.to_string(),
        p if p.starts_with('/') => format!("{prefix}{p}"),
        p => format!("{prefix}/{p}"),
    }
}

/// Rewrite legacy `:id` and `*rest` segments into axum's `{id}` and `{*rest}`.
pub(crate) fn axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `path` with every parameter name blanked: `/pets/{id}` becomes `/pets/{}`.
pub(crate) fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| match (segment.find('{'), segment.find('}')) {
            (Some(open), Some(close)) if open < close => {
                let blank = if segment[open + 1..].starts_with('*') { "{*}" } else { "{}" };
                format!("{}{blank}{}", &segment[..open], &segment[close + 1..])
            }
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parameter names in an axum path (`{id}`, `{*rest}`, and legacy `:id`).
pub fn path_params(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| {
            if let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(inner.trim_start_matches('*').to_string())
            } else {
                segment.strip_prefix(':').map(str::to_string)
            }
        })
        .filter(|name| !name.is_empty())
        .collect()
}
