use std::sync::Arc;

use apiweave_core::http::response::{Html, IntoResponse, Response};
use apiweave_core::http::routing::get;
use apiweave_core::http::{Method, Router, CONTENT_TYPE};
use apiweave_core::{ApiApp, ApiConfig, ApiSettings, BuildError, ConfigError, Plugin, RouteMeta};

use crate::builder::{build_spec, render_spec, write_local_spec, SpecError};
use crate::config::OpenApiConfig;
use crate::ui::docs_page;

/// Plugin that builds the OpenAPI document from the registered routes and
/// serves it, with the docs UI.
///
/// The document is built when the application is built: declaration
/// defects such as two schemas sharing a name make
/// [`ApiApp::build`] fail.
///
/// ```ignore
/// let app = ApiApp::new()
///     .route(Route::get("/pets", list_pets).output(PetOut::schema().many(), 200))
///     .with(OpenApiPlugin::new(OpenApiConfig::new("Petstore", "1.0.0")))
///     .build()?;
/// ```
pub struct OpenApiPlugin {
    config: OpenApiConfig,
}

impl OpenApiPlugin {
    pub fn new(config: OpenApiConfig) -> Self {
        Self { config }
    }

    /// Read the `apiweave.openapi` section of `config`.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(OpenApiConfig::from_config(config)?))
    }
}

impl<S: Clone + Send + Sync + 'static> Plugin<S> for OpenApiPlugin {
    fn install(self, app: ApiApp<S>) -> ApiApp<S> {
        let config = self.config;
        app.with_meta_consumer::<Arc<RouteMeta>, _>(move |routes, settings| {
            openapi_routes::<S>(config, routes, settings).map_err(|err| BuildError::Plugin {
                plugin: "openapi",
                message: err.to_string(),
            })
        })
    }

    fn name(&self) -> &'static str {
        "openapi"
    }
}

/// Build the document of `routes` and a router serving it at
/// `config.spec_path`, plus the docs page at `config.docs_path` when enabled.
pub fn openapi_routes<S: Clone + Send + Sync + 'static>(
    config: OpenApiConfig,
    routes: &[Arc<RouteMeta>],
    settings: &ApiSettings,
) -> Result<Router<S>, SpecError> {
    check_endpoint("spec_path", &config.spec_path, routes)?;
    if config.docs_enabled {
        check_endpoint("docs_path", &config.docs_path, routes)?;
        if config.docs_path == config.spec_path {
            return Err(SpecError::EndpointConflict {
                path: config.docs_path.clone(),
                route: "the OpenAPI document".into(),
            });
        }
    }

    let spec = build_spec(&config, settings, routes)?;
    if let Some(path) = &config.local_spec_path {
        write_local_spec(&spec, path, config.local_spec_json_indent)?;
    }

    let body: Arc<str> = render_spec(&spec, config.spec_format)?.into();
    let mime = config.spec_format.mime_type();
    let mut router = Router::new().route(
        &config.spec_path,
        get(move || {
            let body = body.clone();
            async move { spec_response(mime, &body) }
        }),
    );

    if config.docs_enabled {
        let page: Arc<str> = docs_page(&config).into();
        router = router.route(
            &config.docs_path,
            get(move || {
                let page = page.clone();
                async move { Html(page.to_string()) }
            }),
        );
    }
    Ok(router)
}

/// `path` must be absolute and not already answer `GET`.
fn check_endpoint(
    setting: &'static str,
    path: &str,
    routes: &[Arc<RouteMeta>],
) -> Result<(), SpecError> {
    if !path.starts_with('/') {
        return Err(SpecError::InvalidEndpointPath {
            setting,
            path: path.to_string(),
        });
    }
    match routes
        .iter()
        .find(|meta| meta.path == path && meta.method == Method::GET)
    {
        Some(meta) => Err(SpecError::EndpointConflict {
            path: path.to_string(),
            route: meta.name.clone(),
        }),
        None => Ok(()),
    }
}

fn spec_response(mime: &'static str, body: &str) -> Response {
    ([(CONTENT_TYPE, mime)], body.to_string()).into_response()
}
