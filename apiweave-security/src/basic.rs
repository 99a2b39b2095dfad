use std::sync::Arc;

use apiweave_core::http::response::Response;
use apiweave_core::http::Parts;
use apiweave_core::{AuthOutcome, AuthScheme, HttpError};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::adapter::AdapterOptions;
use crate::credentials::basic_credentials;
use crate::error::SecurityError;

/// Checks a username and password, returning the principal on success.
pub trait VerifyPassword<P>: Send + Sync + 'static {
    fn verify(&self, username: &str, password: &str) -> Option<P>;
}

impl<P, F> VerifyPassword<P> for F
where
    F: Fn(&str, &str) -> Option<P> + Send + Sync + 'static,
{
    fn verify(&self, username: &str, password: &str) -> Option<P> {
        self(username, password)
    }
}

/// HTTP basic authentication.
///
/// ```ignore
/// let auth = HttpBasicAuth::new(|username: &str, password: &str| {
///     (username == "admin" && password == "secret").then(|| User::admin())
/// });
/// app.route(Route::get("/basic", handler).auth_required(&auth));
/// ```
pub struct HttpBasicAuth<P> {
    verify: Arc<dyn VerifyPassword<P>>,
    options: AdapterOptions<P>,
}

impl<P> Clone for HttpBasicAuth<P> {
    fn clone(&self) -> Self {
        Self {
            verify: self.verify.clone(),
            options: self.options.clone(),
        }
    }
}

impl<P> HttpBasicAuth<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new<V: VerifyPassword<P>>(verify: V) -> Self {
        Self {
            verify: Arc::new(verify),
            options: AdapterOptions::new("Basic", "BasicAuth"),
        }
    }

    /// Realm of the `WWW-Authenticate` challenge.
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.options.realm = realm.into();
        self
    }

    /// Name of the OpenAPI security scheme. Defaults to `BasicAuth`.
    pub fn security_scheme_name(mut self, name: impl Into<String>) -> Self {
        self.options.security_scheme_name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.options.description = Some(description.into());
        self
    }

    /// Roles held by a principal, checked against `auth_required` roles.
    pub fn roles<F>(mut self, roles: F) -> Self
    where
        F: Fn(&P) -> Vec<String> + Send + Sync + 'static,
    {
        self.options.roles = Some(Arc::new(roles));
        self
    }

    /// Render 401/403 responses of this adapter.
    pub fn error_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn(&HttpError) -> Response + Send + Sync + 'static,
    {
        self.options.error_processor = Some(Arc::new(processor));
        self
    }
}

impl<P> AuthScheme for HttpBasicAuth<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn scheme_name(&self) -> &str {
        &self.options.security_scheme_name
    }

    fn security_scheme(&self) -> Value {
        self.options.describe(json!({"type": "http", "scheme": "basic"}))
    }

    fn authenticate(&self, parts: &mut Parts) -> AuthOutcome {
        let options = &self.options;
        let credentials = match basic_credentials(parts, &options.scheme) {
            Ok(credentials) => credentials,
            Err(SecurityError::MissingCredentials) => return AuthOutcome::Missing,
            Err(err) => {
                debug!(error = %err, "Malformed basic credentials");
                return AuthOutcome::Rejected;
            }
        };
        match self.verify.verify(&credentials.username, &credentials.password) {
            Some(principal) => {
                debug!(username = %credentials.username, "Basic credentials verified");
                options.accept(parts, principal)
            }
            None => {
                warn!(username = %credentials.username, "Basic credentials rejected");
                AuthOutcome::Rejected
            }
        }
    }

    fn error_response(&self, error: HttpError) -> Response {
        self.options.error_response(error)
    }
}
