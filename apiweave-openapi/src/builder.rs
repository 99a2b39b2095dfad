use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use apiweave_core::http::Method;
use apiweave_core::schema::{http_error_schema, validation_error_schema};
use apiweave_core::{reason_phrase, ApiSettings, RouteMeta, SchemaRef};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::config::{OpenApiConfig, SpecFormat};
use crate::schema::SchemaRegistry;

const VALIDATION_ERROR: &str = "ValidationError";
const HTTP_ERROR: &str = "HTTPError";

/// A defect in the declarations that prevents building the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// Two different schemas were declared under one component name.
    SchemaConflict { name: String },
    /// Two auth adapters describe different security schemes under one name.
    SecuritySchemeConflict { name: String },
    /// `Doc::security` names a scheme that no adapter or config declares.
    UnknownSecurityScheme { route: String, scheme: String },
    /// `spec_path` or `docs_path` does not start with `/`.
    InvalidEndpointPath { setting: &'static str, path: String },
    /// A registered route, or the other endpoint, already serves `GET path`.
    EndpointConflict { path: String, route: String },
    /// The document could not be serialized.
    Render(String),
    /// The local spec file could not be written.
    Io { path: String, message: String },
}

impl std::fmt::Display for SpecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecError::SchemaConflict { name } => write!(
                f,
                "two different schemas are named '{name}'; rename one of them"
            ),
            SpecError::SecuritySchemeConflict { name } => {
                write!(f, "security scheme '{name}' is declared with two different definitions")
            }
            SpecError::UnknownSecurityScheme { route, scheme } => {
                write!(f, "{route}: unknown security scheme '{scheme}'")
            }
            SpecError::InvalidEndpointPath { setting, path } => {
                write!(f, "{setting} '{path}' must start with '/'")
            }
            SpecError::EndpointConflict { path, route } => {
                write!(f, "GET {path} is already served by {route}")
            }
            SpecError::Render(msg) => write!(f, "failed to render the OpenAPI document: {msg}"),
            SpecError::Io { path, message } => write!(f, "failed to write {path}: {message}"),
        }
    }
}

impl std::error::Error for SpecError {}

/// Build the OpenAPI document of `routes`.
///
/// Routes marked `hide` are skipped. Operations are ordered by path, then
/// by method. Named schemas land once under `components.schemas`.
pub fn build_spec(
    config: &OpenApiConfig,
    settings: &ApiSettings,
    routes: &[Arc<RouteMeta>],
) -> Result<Value, SpecError> {
    let mut visible: Vec<&RouteMeta> = routes
        .iter()
        .map(Arc::as_ref)
        .filter(|meta| !meta.doc.hide)
        .collect();
    visible.sort_by(|a, b| {
        openapi_path(&a.path)
            .cmp(&openapi_path(&b.path))
            .then(method_rank(&a.method).cmp(&method_rank(&b.method)))
    });

    let mut builder = SpecBuilder {
        config,
        settings,
        registry: if config.is_v31() {
            SchemaRegistry::openapi_31()
        } else {
            SchemaRegistry::new()
        },
        security_schemes: collect_security_schemes(config, &visible)?,
        used_tags: Vec::new(),
    };

    let mut paths = Map::new();
    for meta in &visible {
        let operation = builder.operation(meta)?;
        let item = paths
            .entry(openapi_path(&meta.path))
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(item) = item {
            item.insert(meta.method.as_str().to_lowercase(), Value::Object(operation));
        }
    }

    let path_count = paths.len();
    let spec = builder.finish(paths);
    info!(
        paths = path_count,
        schemas = spec["components"]["schemas"].as_object().map_or(0, Map::len),
        "OpenAPI document built"
    );
    Ok(match &config.spec_processor {
        Some(processor) => processor(spec),
        None => spec,
    })
}

/// Serialize `spec` for the spec endpoint.
pub fn render_spec(spec: &Value, format: SpecFormat) -> Result<String, SpecError> {
    match format {
        SpecFormat::Json => {
            serde_json::to_string_pretty(spec).map_err(|e| SpecError::Render(e.to_string()))
        }
        SpecFormat::Yaml => serde_yaml::to_string(spec).map_err(|e| SpecError::Render(e.to_string())),
    }
}

/// Write `spec` to `path`: YAML for `.yaml`/`.yml` files, JSON indented by
/// `indent` spaces otherwise.
pub fn write_local_spec(spec: &Value, path: &Path, indent: usize) -> Result<(), SpecError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let content = if is_yaml {
        render_spec(spec, SpecFormat::Yaml)?
    } else {
        json_with_indent(spec, indent)?
    };
    std::fs::write(path, content).map_err(|e| SpecError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    info!(path = %path.display(), "OpenAPI document written");
    Ok(())
}

fn json_with_indent(spec: &Value, indent: usize) -> Result<String, SpecError> {
    use serde::Serialize;

    if indent == 0 {
        return serde_json::to_string(spec).map_err(|e| SpecError::Render(e.to_string()));
    }
    let indent = vec![b' '; indent];
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    spec.serialize(&mut serializer)
        .map_err(|e| SpecError::Render(e.to_string()))?;
    String::from_utf8(out).map_err(|e| SpecError::Render(e.to_string()))
}

/// `{*rest}` becomes `{rest}`; legacy `:id` becomes `{id}`.
pub fn openapi_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix("{*") {
                format!("{{{name}")
            } else if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn method_rank(method: &Method) -> usize {
    const ORDER: [Method; 8] = [
        Method::GET,
        Method::PUT,
        Method::POST,
        Method::DELETE,
        Method::OPTIONS,
        Method::HEAD,
        Method::PATCH,
        Method::TRACE,
    ];
    ORDER
        .iter()
        .position(|m| m == method)
        .unwrap_or(ORDER.len())
}

fn collect_security_schemes(
    config: &OpenApiConfig,
    routes: &[&RouteMeta],
) -> Result<Map<String, Value>, SpecError> {
    let mut schemes = config.security_schemes.clone();
    for meta in routes {
        let Some(auth) = &meta.auth else { continue };
        let name = auth.scheme_name().to_string();
        let scheme = auth.scheme.security_scheme();
        match schemes.get(&name) {
            Some(existing) if *existing != scheme => {
                return Err(SpecError::SecuritySchemeConflict { name })
            }
            Some(_) => {}
            None => {
                schemes.insert(name, scheme);
            }
        }
    }
    Ok(schemes)
}

struct SpecBuilder<'a> {
    config: &'a OpenApiConfig,
    settings: &'a ApiSettings,
    registry: SchemaRegistry,
    security_schemes: Map<String, Value>,
    used_tags: Vec<String>,
}

impl SpecBuilder<'_> {
    fn operation(&mut self, meta: &RouteMeta) -> Result<Map<String, Value>, SpecError> {
        let doc = &meta.doc;
        let mut op = Map::new();

        let tags = if !doc.tags.is_empty() {
            doc.tags.clone()
        } else if self.settings.auto_tags {
            meta.group.iter().map(|group| group.auto_tag()).collect()
        } else {
            Vec::new()
        };
        for tag in &tags {
            if !self.used_tags.contains(tag) {
                self.used_tags.push(tag.clone());
            }
        }
        if !tags.is_empty() {
            op.insert("tags".into(), json!(tags));
        }

        let summary = doc
            .summary
            .clone()
            .or_else(|| self.config.auto_summary.then(|| meta.auto_summary()));
        if let Some(summary) = summary {
            op.insert("summary".into(), json!(summary));
        }
        if let Some(description) = &doc.description {
            op.insert("description".into(), json!(description));
        }
        let operation_id = doc
            .operation_id
            .clone()
            .or_else(|| self.config.auto_operation_id.then(|| meta.auto_operation_id()));
        if let Some(operation_id) = operation_id {
            op.insert("operationId".into(), json!(operation_id));
        }

        let parameters = self.parameters(meta)?;
        if !parameters.is_empty() {
            op.insert("parameters".into(), Value::Array(parameters));
        }
        if let Some(body) = self.request_body(meta)? {
            op.insert("requestBody".into(), body);
        }
        op.insert("responses".into(), self.responses(meta)?);

        if let Some(security) = self.security(meta)? {
            op.insert("security".into(), security);
        }
        if doc.deprecated == Some(true) {
            op.insert("deprecated".into(), Value::Bool(true));
        }
        for (name, value) in &doc.extensions {
            op.insert(name.clone(), value.clone());
        }
        Ok(op)
    }

    fn parameters(&mut self, meta: &RouteMeta) -> Result<Vec<Value>, SpecError> {
        let mut parameters = Vec::new();
        let mut declared_path_params = Vec::new();

        for input in &meta.inputs {
            let Some(location) = input.location.parameter_in() else { continue };
            let Some(schema) = input.schema.schema() else { continue };
            for (name, field) in schema.fields() {
                if field.dump_only {
                    continue;
                }
                let key = field.external_key(name).to_string();
                let mut parameter = Map::new();
                parameter.insert("name".into(), json!(key));
                parameter.insert("in".into(), json!(location));
                parameter.insert(
                    "required".into(),
                    Value::Bool(location == "path" || field.required),
                );
                if let Some(description) = &field.description {
                    parameter.insert("description".into(), json!(description));
                }
                parameter.insert("schema".into(), self.registry.field(field)?);
                if location == "path" {
                    declared_path_params.push(key);
                }
                parameters.push(Value::Object(parameter));
            }
        }

        for name in meta.path_params() {
            if !declared_path_params.contains(&name) {
                parameters.push(json!({
                    "name": name,
                    "in": "path",
                    "required": true,
                    "schema": {"type": "string"}
                }));
            }
        }
        Ok(parameters)
    }

    fn request_body(&mut self, meta: &RouteMeta) -> Result<Option<Value>, SpecError> {
        let Some(input) = meta.body_input() else {
            return Ok(None);
        };
        let schema = self.registry.schema_ref(&input.schema)?;
        let mut content = Map::new();
        for content_type in input.location.content_types() {
            let mut media = Map::new();
            media.insert("schema".into(), schema.clone());
            if let Some(example) = &input.example {
                media.insert("example".into(), example.clone());
            }
            if let Some(examples) = &input.examples {
                media.insert("examples".into(), Value::Object(examples.clone()));
            }
            content.insert(content_type.to_string(), Value::Object(media));
        }
        let mut body = Map::new();
        body.insert("required".into(), Value::Bool(true));
        if let Some(description) = &input.description {
            body.insert("description".into(), json!(description));
        }
        body.insert("content".into(), Value::Object(content));
        Ok(Some(Value::Object(body)))
    }

    fn responses(&mut self, meta: &RouteMeta) -> Result<Value, SpecError> {
        let mut responses: BTreeMap<u16, Map<String, Value>> = BTreeMap::new();

        if let Some(output) = &meta.output {
            let status = output.status.as_u16();
            let mut response = Map::new();
            let description = output
                .description
                .clone()
                .unwrap_or_else(|| self.config.success_description.clone());
            response.insert("description".into(), json!(description));

            if status != 204 && status != 304 {
                let schema = self.success_schema(&output.schema)?;
                let mut media = Map::new();
                media.insert("schema".into(), schema);
                if let Some(example) = &output.example {
                    media.insert("example".into(), example.clone());
                }
                if let Some(examples) = &output.examples {
                    media.insert("examples".into(), Value::Object(examples.clone()));
                }
                response.insert(
                    "content".into(),
                    json!({ output.content_type.as_str(): Value::Object(media) }),
                );
            }
            if let Some(headers) = &output.headers {
                response.insert("headers".into(), self.response_headers(headers)?);
            }
            if let Some(links) = &output.links {
                response.insert("links".into(), Value::Object(links.clone()));
            }
            responses.insert(status, response);
        } else if self.config.auto_200_response {
            let mut response = Map::new();
            response.insert(
                "description".into(),
                json!(self.config.success_description),
            );
            responses.insert(200, response);
        }

        for (&code, doc) in &meta.doc.responses {
            let schema = match &doc.schema {
                Some(schema) => Some(self.registry.schema_ref(schema)?),
                None if code >= 400 => Some(self.http_error()?),
                None => None,
            };
            let response = responses.entry(code).or_default();
            let description = doc.description.clone().or_else(|| {
                response
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
            response.insert(
                "description".into(),
                json!(description.unwrap_or_else(|| reason_phrase(code, "Unknown"))),
            );
            if schema.is_some() || doc.example.is_some() {
                let mut media = Map::new();
                if let Some(schema) = schema {
                    media.insert("schema".into(), schema);
                }
                if let Some(example) = &doc.example {
                    media.insert("example".into(), example.clone());
                }
                let content_type = doc.content_type.as_deref().unwrap_or("application/json");
                response.insert(
                    "content".into(),
                    json!({ content_type: Value::Object(media) }),
                );
            }
        }

        let validates = meta.inputs.iter().any(|input| input.validation);
        if self.config.auto_validation_error_response && validates {
            let code = self.settings.validation_error_status_code;
            if !responses.contains_key(&code) {
                let schema = self.validation_error()?;
                responses.insert(
                    code,
                    error_response(&self.settings.validation_error_description, schema),
                );
            }
        }

        if let Some(auth) = meta.auth.as_ref().filter(|auth| !auth.optional) {
            if self.config.auto_auth_error_response {
                let code = self.settings.auth_error_status_code;
                if !responses.contains_key(&code) {
                    let schema = self.http_error()?;
                    responses.insert(
                        code,
                        error_response(&self.config.auth_error_description, schema),
                    );
                }
                if !auth.roles.is_empty() && !responses.contains_key(&403) {
                    let schema = self.http_error()?;
                    responses.insert(403, error_response("Forbidden", schema));
                }
            }
        }

        if self.config.auto_404_response
            && !meta.path_params().is_empty()
            && !responses.contains_key(&404)
        {
            let schema = self.http_error()?;
            responses.insert(
                404,
                error_response(&self.config.not_found_description, schema),
            );
        }

        Ok(Value::Object(
            responses
                .into_iter()
                .map(|(code, response)| (code.to_string(), Value::Object(response)))
                .collect(),
        ))
    }

    /// The success body schema, wrapped in the base response envelope when
    /// one is configured.
    fn success_schema(&mut self, schema: &SchemaRef) -> Result<Value, SpecError> {
        let settings = self.settings;
        let data = self.registry.schema_ref(schema)?;
        let base = match (&settings.base_response_schema, schema) {
            (Some(base), SchemaRef::Named(_) | SchemaRef::Inline(_) | SchemaRef::Empty) => base,
            _ => return Ok(data),
        };
        let mut envelope = self.registry.object(base)?;
        if let Some(Value::Object(properties)) = envelope.get_mut("properties") {
            properties.insert(settings.base_response_data_key.clone(), data);
        }
        Ok(envelope)
    }

    fn response_headers(&mut self, headers: &SchemaRef) -> Result<Value, SpecError> {
        let Some(schema) = headers.schema() else {
            return Ok(json!({}));
        };
        let mut out = Map::new();
        for (name, field) in schema.fields() {
            let mut header = Map::new();
            if let Some(description) = &field.description {
                header.insert("description".into(), json!(description));
            }
            if field.required {
                header.insert("required".into(), Value::Bool(true));
            }
            header.insert("schema".into(), self.registry.field(field)?);
            out.insert(field.external_key(name).to_string(), Value::Object(header));
        }
        Ok(Value::Object(out))
    }

    fn security(&self, meta: &RouteMeta) -> Result<Option<Value>, SpecError> {
        if let Some(requirements) = &meta.doc.security {
            let mut security = Vec::new();
            for (scheme, scopes) in requirements {
                if !self.security_schemes.contains_key(scheme) {
                    return Err(SpecError::UnknownSecurityScheme {
                        route: format!("{} {}", meta.method, meta.path),
                        scheme: scheme.clone(),
                    });
                }
                security.push(json!({ scheme.as_str(): scopes }));
            }
            return Ok(Some(Value::Array(security)));
        }
        Ok(meta.auth.as_ref().map(|auth| {
            let mut security = vec![json!({ auth.scheme_name(): [] })];
            if auth.optional {
                security.push(json!({}));
            }
            Value::Array(security)
        }))
    }

    fn validation_error(&mut self) -> Result<Value, SpecError> {
        let config = self.config;
        let schema = match &config.validation_error_schema {
            Some(schema) => self.component_body(schema)?,
            None => validation_error_schema(),
        };
        self.registry.register(VALIDATION_ERROR, schema)
    }

    fn http_error(&mut self) -> Result<Value, SpecError> {
        let config = self.config;
        let schema = match &config.http_error_schema {
            Some(schema) => self.component_body(schema)?,
            None => http_error_schema(),
        };
        self.registry.register(HTTP_ERROR, schema)
    }

    fn component_body(&mut self, schema: &SchemaRef) -> Result<Value, SpecError> {
        match schema {
            SchemaRef::Named(schema) | SchemaRef::Inline(schema) => self.registry.object(schema),
            other => self.registry.schema_ref(other),
        }
    }

    fn finish(self, paths: Map<String, Value>) -> Value {
        let config = self.config;

        let mut info = Map::new();
        info.insert("title".into(), json!(config.title));
        info.insert("version".into(), json!(config.version));
        if let Some(description) = &config.description {
            info.insert("description".into(), json!(description));
        }
        if let Some(terms) = &config.terms_of_service {
            info.insert("termsOfService".into(), json!(terms));
        }
        if let Some(contact) = &config.contact {
            info.insert("contact".into(), contact.clone());
        }
        if let Some(license) = &config.license {
            info.insert("license".into(), license.clone());
        }

        let mut spec = Map::new();
        spec.insert("openapi".into(), json!(config.openapi_version));
        spec.insert("info".into(), Value::Object(info));
        if let Some(servers) = &config.servers {
            spec.insert("servers".into(), servers.clone());
        }

        let tags = match &config.tags {
            Some(tags) => serde_json::to_value(tags).unwrap_or_else(|_| json!([])),
            None => Value::Array(
                self.used_tags
                    .iter()
                    .map(|name| json!({ "name": name }))
                    .collect(),
            ),
        };
        if tags.as_array().is_some_and(|tags| !tags.is_empty()) {
            spec.insert("tags".into(), tags);
        }

        spec.insert("paths".into(), Value::Object(paths));

        let mut components = Map::new();
        if !self.registry.is_empty() {
            components.insert(
                "schemas".into(),
                Value::Object(self.registry.into_schemas()),
            );
        }
        if !self.security_schemes.is_empty() {
            components.insert(
                "securitySchemes".into(),
                Value::Object(self.security_schemes),
            );
        }
        if !components.is_empty() {
            spec.insert("components".into(), Value::Object(components));
        }
        if let Some(external_docs) = &config.external_docs {
            if let Ok(value) = serde_json::to_value(external_docs) {
                spec.insert("externalDocs".into(), value);
            }
        }
        Value::Object(spec)
    }
}

fn error_response(description: &str, schema: Value) -> Map<String, Value> {
    let mut response = Map::new();
    response.insert("description".into(), json!(description));
    response.insert(
        "content".into(),
        json!({"application/json": {"schema": schema}}),
    );
    response
}
