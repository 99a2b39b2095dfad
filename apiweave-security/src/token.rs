use std::sync::Arc;

use apiweave_core::http::response::Response;
use apiweave_core::http::Parts;
use apiweave_core::{AuthOutcome, AuthScheme, HttpError};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::adapter::AdapterOptions;
use crate::credentials::{bearer_token, header_token};
use crate::error::SecurityError;

/// Checks a token, returning the principal on success.
pub trait VerifyToken<P>: Send + Sync + 'static {
    fn verify(&self, token: &str) -> Option<P>;
}

impl<P, F> VerifyToken<P> for F
where
    F: Fn(&str) -> Option<P> + Send + Sync + 'static,
{
    fn verify(&self, token: &str) -> Option<P> {
        self(token)
    }
}

/// HTTP token authentication.
///
/// By default the token is read from `Authorization: Bearer <token>`.
/// [`HttpTokenAuth::header`] switches to a raw token in a custom header, which
/// is documented as an `apiKey` security scheme.
pub struct HttpTokenAuth<P> {
    verify: Arc<dyn VerifyToken<P>>,
    header: Option<String>,
    options: AdapterOptions<P>,
}

impl<P> Clone for HttpTokenAuth<P> {
    fn clone(&self) -> Self {
        Self {
            verify: self.verify.clone(),
            header: self.header.clone(),
            options: self.options.clone(),
        }
    }
}

impl<P> HttpTokenAuth<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new<V: VerifyToken<P>>(verify: V) -> Self {
        Self {
            verify: Arc::new(verify),
            header: None,
            options: AdapterOptions::new("Bearer", "BearerAuth"),
        }
    }

    /// Authorization scheme expected before the token. Defaults to `Bearer`.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.options.scheme = scheme.into();
        self
    }

    /// Read the token from `header` instead of `Authorization`.
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        if self.options.security_scheme_name == "BearerAuth" {
            self.options.security_scheme_name = "ApiKeyAuth".to_string();
        }
        self
    }

    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.options.realm = realm.into();
        self
    }

    pub fn security_scheme_name(mut self, name: impl Into<String>) -> Self {
        self.options.security_scheme_name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.options.description = Some(description.into());
        self
    }

    pub fn roles<F>(mut self, roles: F) -> Self
    where
        F: Fn(&P) -> Vec<String> + Send + Sync + 'static,
    {
        self.options.roles = Some(Arc::new(roles));
        self
    }

    pub fn error_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn(&HttpError) -> Response + Send + Sync + 'static,
    {
        self.options.error_processor = Some(Arc::new(processor));
        self
    }

    fn token<'a>(&self, parts: &'a Parts) -> Result<&'a str, SecurityError> {
        match &self.header {
            Some(header) => header_token(parts, header),
            None => bearer_token(parts, &self.options.scheme),
        }
    }
}

impl<P> AuthScheme for HttpTokenAuth<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn scheme_name(&self) -> &str {
        &self.options.security_scheme_name
    }

    fn security_scheme(&self) -> Value {
        let scheme = match &self.header {
            Some(header) => json!({"type": "apiKey", "in": "header", "name": header}),
            None => json!({"type": "http", "scheme": self.options.scheme.to_lowercase()}),
        };
        self.options.describe(scheme)
    }

    fn authenticate(&self, parts: &mut Parts) -> AuthOutcome {
        let principal = match self.token(parts) {
            Ok(token) => self.verify.verify(token),
            Err(SecurityError::MissingCredentials) => return AuthOutcome::Missing,
            Err(err) => {
                debug!(error = %err, "Malformed token credentials");
                return AuthOutcome::Rejected;
            }
        };
        match principal {
            Some(principal) => self.options.accept(parts, principal),
            None => {
                warn!(uri = %parts.uri, "Token rejected");
                AuthOutcome::Rejected
            }
        }
    }

    fn error_response(&self, error: HttpError) -> Response {
        self.options.error_response(error)
    }
}
