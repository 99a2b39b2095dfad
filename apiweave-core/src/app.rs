use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::Arc;

use tracing::info;

use crate::config::{ApiConfig, ConfigError};
use crate::error::{BuildError, HttpError, RenderedError};
use crate::http::body::HttpBody;
use crate::http::extract::{Request, State};
use crate::http::middleware::{self, Next};
use crate::http::response::{IntoResponse, Response};
use crate::http::routing::Route as AxumRoute;
use crate::http::{HeaderMap, Router, CONTENT_LENGTH, CONTENT_TYPE};
use crate::layers;
use crate::meta::MetaRegistry;
use crate::pipeline::{route_pipeline, RouteContext};
use crate::plugin::Plugin;
use crate::route::{path_shape, GroupInfo, Route, RouteGroup};
use crate::settings::ApiSettings;

/// Renders every [`HttpError`] of the application, replacing the default
/// `{"message", "detail"}` body.
pub type ErrorProcessor = Arc<dyn Fn(&HttpError) -> Response + Send + Sync>;

type MetaConsumer<S> =
    Box<dyn FnOnce(&MetaRegistry, &ApiSettings) -> Result<Router<S>, BuildError> + Send>;
type LayerFn = Box<dyn FnOnce(Router) -> Router + Send>;

struct PendingRoute<S> {
    route: Route<S>,
    prefix: String,
    group: Option<GroupInfo>,
}

/// Assembles routes, plugins and layers into an axum [`Router`].
///
/// ```ignore
/// let app = ApiApp::with_state(store)
///     .with_config(&config)?
///     .route(Route::post("/pets", create_pet).input(PetIn::schema(), Location::Json))
///     .group(RouteGroup::new("pets").prefix("/pets").route(Route::get("/{id}", get_pet)))
///     .with(OpenApiPlugin::new(openapi_config))
///     .build()?;
/// ```
pub struct ApiApp<S: Clone + Send + Sync + 'static = ()> {
    state: S,
    settings: ApiSettings,
    routes: Vec<PendingRoute<S>>,
    routers: Vec<Router<S>>,
    meta_registry: MetaRegistry,
    meta_consumers: Vec<MetaConsumer<S>>,
    layers: Vec<LayerFn>,
    error_processor: Option<ErrorProcessor>,
}

impl ApiApp<()> {
    pub fn new() -> Self {
        Self::with_state(())
    }
}

impl Default for ApiApp<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + Sync + 'static> ApiApp<S> {
    pub fn with_state(state: S) -> Self {
        Self {
            state,
            settings: ApiSettings::default(),
            routes: Vec::new(),
            routers: Vec::new(),
            meta_registry: MetaRegistry::new(),
            meta_consumers: Vec::new(),
            layers: Vec::new(),
            error_processor: None,
        }
    }

    pub fn settings(mut self, settings: ApiSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn api_settings(&self) -> &ApiSettings {
        &self.settings
    }

    /// Read the `apiweave` section of `config`. A base response schema set
    /// programmatically is kept.
    pub fn with_config(mut self, config: &ApiConfig) -> Result<Self, ConfigError> {
        let base = self.settings.base_response_schema.take();
        self.settings = ApiSettings::from_config(config)?;
        self.settings.base_response_schema = base;
        Ok(self)
    }

    pub fn route(mut self, route: Route<S>) -> Self {
        self.routes.push(PendingRoute {
            route,
            prefix: String::new(),
            group: None,
        });
        self
    }

    pub fn group(mut self, group: RouteGroup<S>) -> Self {
        for route in group.routes {
            self.routes.push(PendingRoute {
                route,
                prefix: group.prefix.clone(),
                group: Some(group.info.clone()),
            });
        }
        self
    }

    /// Merge a plain axum router. Its routes bypass validation and do not
    /// appear in the OpenAPI document.
    pub fn merge(mut self, router: Router<S>) -> Self {
        self.routers.push(router);
        self
    }

    pub fn with<P: Plugin<S>>(self, plugin: P) -> Self {
        tracing::debug!(plugin = plugin.name(), "Installing plugin");
        plugin.install(self)
    }

    pub fn push_meta<M: Any + Send + Sync>(mut self, item: M) -> Self {
        self.meta_registry.push(item);
        self
    }

    /// Register a consumer of the collected metadata of type `M`.
    ///
    /// Route metadata is available as `Arc<RouteMeta>`. The consumer runs at
    /// [`build`](Self::build) time and its router is merged into the app.
    pub fn with_meta_consumer<M, F>(mut self, f: F) -> Self
    where
        M: Any + Send + Sync,
        F: FnOnce(&[M], &ApiSettings) -> Result<Router<S>, BuildError> + Send + 'static,
    {
        self.meta_consumers
            .push(Box::new(move |registry, settings| f(registry.get::<M>(), settings)));
        self
    }

    pub fn error_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn(&HttpError) -> Response + Send + Sync + 'static,
    {
        self.error_processor = Some(Arc::new(processor));
        self
    }

    pub fn with_layer<L>(mut self, layer: L) -> Self
    where
        L: tower::Layer<AxumRoute> + Clone + Send + Sync + 'static,
        L::Service: tower::Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as tower::Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as tower::Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as tower::Service<Request>>::Future: Send + 'static,
    {
        self.layers.push(Box::new(move |router| router.layer(layer)));
        self
    }

    pub fn with_layer_fn<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.layers.push(Box::new(f));
        self
    }

    /// Freeze every route, run the metadata consumers and apply the layers.
    ///
    /// Fails on declaration defects (duplicate inputs, a route registered
    /// twice, a path without a leading `/` or with clashing parameter names)
    /// and on whatever the consumers reject, e.g. schema name conflicts in
    /// the OpenAPI document.
    pub fn build(self) -> Result<Router, BuildError> {
        let settings = Arc::new(self.settings);
        let mut registry = self.meta_registry;
        let mut router = Router::new();
        let mut seen = HashSet::new();
        let mut shapes: HashMap<String, String> = HashMap::new();

        for pending in self.routes {
            let (meta, handler) = pending
                .route
                .freeze(&pending.prefix, pending.group.as_ref())?;
            if !seen.insert((meta.method.clone(), meta.path.clone())) {
                return Err(BuildError::DuplicateRoute {
                    method: meta.method.to_string(),
                    path: meta.path,
                });
            }
            let existing = shapes
                .entry(path_shape(&meta.path))
                .or_insert_with(|| meta.path.clone());
            if *existing != meta.path {
                return Err(BuildError::ConflictingPaths {
                    path: meta.path,
                    existing: existing.clone(),
                });
            }
            info!(method = %meta.method, path = %meta.path, name = %meta.name, "Route registered");
            let meta = Arc::new(meta);
            let ctx = Arc::new(RouteContext {
                meta: meta.clone(),
                settings: settings.clone(),
            });
            let path = meta.path.clone();
            registry.push(meta);
            router = router.route(
                &path,
                handler.route_layer(middleware::from_fn_with_state(ctx, route_pipeline)),
            );
        }

        for extra in self.routers {
            router = router.merge(extra);
        }
        for consumer in self.meta_consumers {
            router = router.merge(consumer(&registry, settings.as_ref())?);
        }

        let mut app: Router = router.with_state(self.state);
        for layer_fn in self.layers {
            app = layer_fn(app);
        }
        let errors = ErrorRendering {
            processor: self.error_processor,
            json_errors: settings.json_errors,
        };
        app = app
            .layer(layers::catch_panic_layer())
            .layer(middleware::from_fn_with_state(errors, render_errors));
        if settings.trace_requests {
            app = app.layer(layers::default_trace());
        }
        Ok(app)
    }

    /// Build the application and serve it on `addr` until Ctrl-C or SIGTERM.
    pub async fn serve(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.build()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "apiweave server listening");
        crate::http::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("apiweave server stopped");
        Ok(())
    }
}

#[derive(Clone)]
struct ErrorRendering {
    processor: Option<ErrorProcessor>,
    json_errors: bool,
}

/// The application-wide error renderer: re-renders [`HttpError`] responses
/// through the error processor and turns bodiless framework errors (unknown
/// route, method not allowed) into the JSON envelope.
async fn render_errors(
    State(rendering): State<ErrorRendering>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if let Some(processor) = &rendering.processor {
        if let Some(RenderedError(error)) = response.extensions().get::<RenderedError>() {
            return processor(error);
        }
    }
    if response.extensions().get::<RenderedError>().is_some() || !rendering.json_errors {
        return response;
    }
    let is_error = status.is_client_error() || status.is_server_error();
    if !is_error || response.body().size_hint().exact() != Some(0) {
        return response;
    }
    let error = HttpError::new(status).headers(framework_headers(response.headers()));
    match &rendering.processor {
        Some(processor) => processor(&error),
        None => error.into_response(),
    }
}

fn framework_headers(headers: &HeaderMap) -> HeaderMap {
    let mut kept = headers.clone();
    kept.remove(CONTENT_LENGTH);
    kept.remove(CONTENT_TYPE);
    kept
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
