use std::path::PathBuf;
use std::sync::Arc;

use apiweave_core::{ApiConfig, ConfigError, SchemaRef};
use serde::Serialize;
use serde_json::Value;

/// Hook applied to the finished document before it is served.
pub type SpecProcessor = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Serialization of the spec endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            SpecFormat::Json => "application/json",
            SpecFormat::Yaml => "text/vnd.yaml",
        }
    }

    fn parse(value: &str, key: &str) -> Result<Self, ConfigError> {
        match value.to_lowercase().as_str() {
            "json" => Ok(SpecFormat::Json),
            "yaml" | "yml" => Ok(SpecFormat::Yaml),
            other => Err(ConfigError::Invalid {
                key: key.to_string(),
                message: format!("unknown spec format '{other}', expected json or yaml"),
            }),
        }
    }
}

/// The interactive documentation page served at `docs_path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocsUi {
    SwaggerUi,
    Redoc,
    Elements,
    Rapidoc,
    Rapipdf,
}

impl DocsUi {
    fn parse(value: &str, key: &str) -> Result<Self, ConfigError> {
        match value.to_lowercase().as_str() {
            "swagger-ui" | "swagger_ui" | "swagger" => Ok(DocsUi::SwaggerUi),
            "redoc" => Ok(DocsUi::Redoc),
            "elements" => Ok(DocsUi::Elements),
            "rapidoc" => Ok(DocsUi::Rapidoc),
            "rapipdf" => Ok(DocsUi::Rapipdf),
            other => Err(ConfigError::Invalid {
                key: key.to_string(),
                message: format!(
                    "unknown docs UI '{other}', expected swagger-ui, redoc, elements, rapidoc or rapipdf"
                ),
            }),
        }
    }
}

/// Top-level tag of the document.
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "externalDocs", skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            external_docs: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn external_docs(mut self, docs: ExternalDocs) -> Self {
        self.external_docs = Some(docs);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExternalDocs {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ExternalDocs {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// CDN locations and options of the documentation pages.
#[derive(Debug, Clone)]
pub struct UiAssets {
    pub favicon: String,
    pub swagger_ui_css: String,
    pub swagger_ui_bundle_js: String,
    pub swagger_ui_standalone_preset_js: String,
    pub swagger_ui_layout: String,
    pub redoc_js: String,
    pub elements_js: String,
    pub elements_css: String,
    pub elements_layout: String,
    pub rapidoc_js: String,
    pub rapidoc_theme: String,
    pub rapipdf_js: String,
}

impl Default for UiAssets {
    fn default() -> Self {
        Self {
            favicon: "https://apiflask.com/_assets/favicon.png".to_string(),
            swagger_ui_css: "https://cdn.jsdelivr.net/npm/swagger-ui-dist/swagger-ui.css".to_string(),
            swagger_ui_bundle_js: "https://cdn.jsdelivr.net/npm/swagger-ui-dist/swagger-ui-bundle.js"
                .to_string(),
            swagger_ui_standalone_preset_js:
                "https://cdn.jsdelivr.net/npm/swagger-ui-dist/swagger-ui-standalone-preset.js"
                    .to_string(),
            swagger_ui_layout: "BaseLayout".to_string(),
            redoc_js: "https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js".to_string(),
            elements_js: "https://cdn.jsdelivr.net/npm/@stoplight/elements/web-components.min.js"
                .to_string(),
            elements_css: "https://cdn.jsdelivr.net/npm/@stoplight/elements/styles.min.css"
                .to_string(),
            elements_layout: "sidebar".to_string(),
            rapidoc_js: "https://cdn.jsdelivr.net/npm/rapidoc/dist/rapidoc-min.js".to_string(),
            rapidoc_theme: "light".to_string(),
            rapipdf_js: "https://cdn.jsdelivr.net/npm/rapipdf/dist/rapipdf-min.js".to_string(),
        }
    }
}

/// Configuration of the generated OpenAPI document and its endpoints.
///
/// Most settings can come from the `apiweave.openapi` section of the
/// configuration; see [`OpenApiConfig::from_config`]. Tags, external docs,
/// extra security schemes, the error schema overrides and the spec
/// processor are set programmatically.
#[derive(Clone)]
pub struct OpenApiConfig {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub terms_of_service: Option<String>,
    pub contact: Option<Value>,
    pub license: Option<Value>,
    pub servers: Option<Value>,
    pub openapi_version: String,
    pub tags: Option<Vec<Tag>>,
    pub external_docs: Option<ExternalDocs>,
    pub security_schemes: serde_json::Map<String, Value>,

    pub spec_path: String,
    pub spec_format: SpecFormat,
    pub docs_path: String,
    pub docs_ui: DocsUi,
    pub docs_enabled: bool,
    pub local_spec_path: Option<PathBuf>,
    pub local_spec_json_indent: usize,

    pub auto_summary: bool,
    pub auto_operation_id: bool,
    pub auto_200_response: bool,
    pub auto_404_response: bool,
    pub auto_validation_error_response: bool,
    pub auto_auth_error_response: bool,

    pub success_description: String,
    pub not_found_description: String,
    pub auth_error_description: String,

    pub validation_error_schema: Option<SchemaRef>,
    pub http_error_schema: Option<SchemaRef>,
    pub ui: UiAssets,
    pub(crate) spec_processor: Option<SpecProcessor>,
}

impl std::fmt::Debug for OpenApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenApiConfig")
            .field("title", &self.title)
            .field("version", &self.version)
            .field("openapi_version", &self.openapi_version)
            .field("spec_path", &self.spec_path)
            .field("docs_path", &self.docs_path)
            .field("docs_ui", &self.docs_ui)
            .field("docs_enabled", &self.docs_enabled)
            .finish_non_exhaustive()
    }
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self::new("API", "0.1.0")
    }
}

impl OpenApiConfig {
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            title: title.to_string(),
            version: version.to_string(),
            description: None,
            terms_of_service: None,
            contact: None,
            license: None,
            servers: None,
            openapi_version: "3.0.3".to_string(),
            tags: None,
            external_docs: None,
            security_schemes: serde_json::Map::new(),
            spec_path: "/openapi.json".to_string(),
            spec_format: SpecFormat::Json,
            docs_path: "/docs".to_string(),
            docs_ui: DocsUi::SwaggerUi,
            docs_enabled: true,
            local_spec_path: None,
            local_spec_json_indent: 2,
            auto_summary: true,
            auto_operation_id: false,
            auto_200_response: true,
            auto_404_response: true,
            auto_validation_error_response: true,
            auto_auth_error_response: true,
            success_description: "Successful response".to_string(),
            not_found_description: "Not found".to_string(),
            auth_error_description: "Authentication error".to_string(),
            validation_error_schema: None,
            http_error_schema: None,
            ui: UiAssets::default(),
            spec_processor: None,
        }
    }

    /// Read the `apiweave.openapi` section of `config`:
    ///
    /// ```yaml
    /// apiweave:
    ///   openapi:
    ///     title: Petstore
    ///     version: 1.0.0
    ///     spec_format: yaml
    ///     docs_ui: redoc
    ///     servers:
    ///       - url: https://pets.example.com
    /// ```
    pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
        const P: &str = "apiweave.openapi";
        let key = |name: &str| format!("{P}.{name}");
        let d = Self::default();
        let ui = UiAssets::default();

        let spec_format = match config.get::<Option<String>>(&key("spec_format")) {
            Ok(Some(value)) => SpecFormat::parse(&value, &key("spec_format"))?,
            Ok(None) | Err(ConfigError::NotFound(_)) => d.spec_format,
            Err(err) => return Err(err),
        };
        let docs_ui = match config.get::<Option<String>>(&key("docs_ui")) {
            Ok(Some(value)) => DocsUi::parse(&value, &key("docs_ui"))?,
            Ok(None) | Err(ConfigError::NotFound(_)) => d.docs_ui,
            Err(err) => return Err(err),
        };

        Ok(Self {
            title: config.get_or(&key("title"), d.title)?,
            version: config.get_or(&key("version"), d.version)?,
            description: config.get_or(&key("description"), None)?,
            terms_of_service: config.get_or(&key("terms_of_service"), None)?,
            contact: config.get_or(&key("contact"), None)?,
            license: config.get_or(&key("license"), None)?,
            servers: config.get_or(&key("servers"), None)?,
            openapi_version: config.get_or(&key("openapi_version"), d.openapi_version)?,
            spec_path: config.get_or(&key("spec_path"), d.spec_path)?,
            spec_format,
            docs_path: config.get_or(&key("docs_path"), d.docs_path)?,
            docs_ui,
            docs_enabled: config.get_or(&key("docs_enabled"), d.docs_enabled)?,
            local_spec_path: config
                .get_or::<Option<String>>(&key("local_spec_path"), None)?
                .map(PathBuf::from),
            local_spec_json_indent: config
                .get_or(&key("local_spec_json_indent"), d.local_spec_json_indent)?,
            auto_summary: config.get_or(&key("auto_summary"), d.auto_summary)?,
            auto_operation_id: config.get_or(&key("auto_operation_id"), d.auto_operation_id)?,
            auto_200_response: config.get_or(&key("auto_200_response"), d.auto_200_response)?,
            auto_404_response: config.get_or(&key("auto_404_response"), d.auto_404_response)?,
            auto_validation_error_response: config.get_or(
                &key("auto_validation_error_response"),
                d.auto_validation_error_response,
            )?,
            auto_auth_error_response: config
                .get_or(&key("auto_auth_error_response"), d.auto_auth_error_response)?,
            success_description: config
                .get_or(&key("success_description"), d.success_description)?,
            not_found_description: config
                .get_or(&key("not_found_description"), d.not_found_description)?,
            auth_error_description: config
                .get_or(&key("auth_error_description"), d.auth_error_description)?,
            ui: UiAssets {
                favicon: config.get_or(&key("docs_favicon"), ui.favicon)?,
                swagger_ui_css: config.get_or(&key("swagger_ui_css"), ui.swagger_ui_css)?,
                swagger_ui_bundle_js: config
                    .get_or(&key("swagger_ui_bundle_js"), ui.swagger_ui_bundle_js)?,
                swagger_ui_standalone_preset_js: config.get_or(
                    &key("swagger_ui_standalone_preset_js"),
                    ui.swagger_ui_standalone_preset_js,
                )?,
                swagger_ui_layout: config.get_or(&key("swagger_ui_layout"), ui.swagger_ui_layout)?,
                redoc_js: config.get_or(&key("redoc_js"), ui.redoc_js)?,
                elements_js: config.get_or(&key("elements_js"), ui.elements_js)?,
                elements_css: config.get_or(&key("elements_css"), ui.elements_css)?,
                elements_layout: config.get_or(&key("elements_layout"), ui.elements_layout)?,
                rapidoc_js: config.get_or(&key("rapidoc_js"), ui.rapidoc_js)?,
                rapidoc_theme: config.get_or(&key("rapidoc_theme"), ui.rapidoc_theme)?,
                rapipdf_js: config.get_or(&key("rapipdf_js"), ui.rapipdf_js)?,
            },
            ..d
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_openapi_version(mut self, version: &str) -> Self {
        self.openapi_version = version.to_string();
        self
    }

    pub fn with_servers(mut self, servers: Value) -> Self {
        self.servers = Some(servers);
        self
    }

    pub fn with_tags<I: IntoIterator<Item = Tag>>(mut self, tags: I) -> Self {
        self.tags = Some(tags.into_iter().collect());
        self
    }

    pub fn with_external_docs(mut self, docs: ExternalDocs) -> Self {
        self.external_docs = Some(docs);
        self
    }

    /// Declare a security scheme that no `auth_required` route contributes,
    /// so `Doc::security` can reference it.
    pub fn with_security_scheme(mut self, name: &str, scheme: Value) -> Self {
        self.security_schemes.insert(name.to_string(), scheme);
        self
    }

    pub fn with_spec_path(mut self, path: &str) -> Self {
        self.spec_path = path.to_string();
        self
    }

    pub fn with_spec_format(mut self, format: SpecFormat) -> Self {
        self.spec_format = format;
        self
    }

    pub fn with_docs_path(mut self, path: &str) -> Self {
        self.docs_path = path.to_string();
        self
    }

    pub fn with_docs_ui(mut self, ui: DocsUi) -> Self {
        self.docs_ui = ui;
        self
    }

    pub fn with_docs_enabled(mut self, enabled: bool) -> Self {
        self.docs_enabled = enabled;
        self
    }

    /// Write the document to `path` when the application is built. A
    /// `.yaml`/`.yml` extension selects YAML.
    pub fn with_local_spec_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_spec_path = Some(path.into());
        self
    }

    pub fn with_auto_operation_id(mut self, enabled: bool) -> Self {
        self.auto_operation_id = enabled;
        self
    }

    pub fn with_validation_error_schema(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.validation_error_schema = Some(schema.into());
        self
    }

    pub fn with_http_error_schema(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.http_error_schema = Some(schema.into());
        self
    }

    /// Post-process the finished document, e.g. to add vendor extensions.
    pub fn spec_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.spec_processor = Some(Arc::new(processor));
        self
    }

    /// Whether the document targets OpenAPI 3.1 (JSON Schema 2020-12 nullability).
    pub(crate) fn is_v31(&self) -> bool {
        self.openapi_version.starts_with("3.1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_an_empty_config() {
        let config = OpenApiConfig::from_config(&ApiConfig::empty()).unwrap();
        assert_eq!(config.openapi_version, "3.0.3");
        assert_eq!(config.spec_path, "/openapi.json");
        assert_eq!(config.docs_ui, DocsUi::SwaggerUi);
        assert!(config.docs_enabled);
        assert!(!config.auto_operation_id);
    }

    #[test]
    fn yaml_section_is_read() {
        let config = ApiConfig::from_yaml_str(
            "apiweave:\n  openapi:\n    title: Petstore\n    spec_format: yaml\n    docs_ui: redoc\n    contact:\n      name: Team\n    servers:\n      - url: https://pets.example.com\n",
        )
        .unwrap();
        let openapi = OpenApiConfig::from_config(&config).unwrap();
        assert_eq!(openapi.title, "Petstore");
        assert_eq!(openapi.spec_format, SpecFormat::Yaml);
        assert_eq!(openapi.docs_ui, DocsUi::Redoc);
        assert_eq!(openapi.contact.unwrap()["name"], "Team");
        assert_eq!(openapi.servers.unwrap()[0]["url"], "https://pets.example.com");
    }

    #[test]
    fn unknown_docs_ui_is_invalid() {
        let config = ApiConfig::from_yaml_str("apiweave:\n  openapi:\n    docs_ui: fancy\n").unwrap();
        assert!(matches!(
            OpenApiConfig::from_config(&config),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
