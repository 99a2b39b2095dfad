use crate::app::ApiApp;

/// A composable unit installed into an [`ApiApp`] with `.with(plugin)`.
///
/// Plugins add routes, layers or metadata consumers. The OpenAPI plugin,
/// for instance, registers a consumer that turns the route metadata into
/// the spec and docs endpoints.
///
/// ```ignore
/// pub struct Health;
///
/// impl<S: Clone + Send + Sync + 'static> Plugin<S> for Health {
///     fn install(self, app: ApiApp<S>) -> ApiApp<S> {
///         app.merge(Router::new().route("/health", get(|| async { "OK" })))
///     }
/// }
/// ```
pub trait Plugin<S: Clone + Send + Sync + 'static = ()> {
    fn install(self, app: ApiApp<S>) -> ApiApp<S>;

    /// The name of this plugin, for diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
