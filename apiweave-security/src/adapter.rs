use std::sync::Arc;

use apiweave_core::http::response::{IntoResponse, Response};
use apiweave_core::http::{HeaderValue, Parts, StatusCode, WWW_AUTHENTICATE};
use apiweave_core::{AuthOutcome, HttpError};

use crate::current_user::CurrentUser;

/// Renders the failures of one adapter, replacing the JSON error envelope.
pub type AuthErrorProcessor = Arc<dyn Fn(&HttpError) -> Response + Send + Sync>;

pub(crate) type RolesFn<P> = Arc<dyn Fn(&P) -> Vec<String> + Send + Sync>;

/// Settings shared by the basic and token adapters.
pub(crate) struct AdapterOptions<P> {
    pub(crate) scheme: String,
    pub(crate) realm: String,
    pub(crate) security_scheme_name: String,
    pub(crate) description: Option<String>,
    pub(crate) roles: Option<RolesFn<P>>,
    pub(crate) error_processor: Option<AuthErrorProcessor>,
}

impl<P> Clone for AdapterOptions<P> {
    fn clone(&self) -> Self {
        Self {
            scheme: self.scheme.clone(),
            realm: self.realm.clone(),
            security_scheme_name: self.security_scheme_name.clone(),
            description: self.description.clone(),
            roles: self.roles.clone(),
            error_processor: self.error_processor.clone(),
        }
    }
}

impl<P> AdapterOptions<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(scheme: &str, security_scheme_name: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            realm: "Authentication Required".to_string(),
            security_scheme_name: security_scheme_name.to_string(),
            description: None,
            roles: None,
            error_processor: None,
        }
    }

    /// Store the verified principal for [`CurrentUser`] and report its roles.
    pub(crate) fn accept(&self, parts: &mut Parts, principal: P) -> AuthOutcome {
        let roles = self
            .roles
            .as_ref()
            .map(|roles| roles(&principal))
            .unwrap_or_default();
        parts.extensions.insert(CurrentUser(principal));
        AuthOutcome::Authenticated { roles }
    }

    /// `<scheme> realm="<realm>"`.
    pub(crate) fn challenge(&self) -> String {
        format!("{} realm=\"{}\"", self.scheme, self.realm)
    }

    /// Render `error` through the adapter's processor, if any. 401 responses
    /// carry the `WWW-Authenticate` challenge.
    pub(crate) fn error_response(&self, mut error: HttpError) -> Response {
        let challenge = error.status == StatusCode::UNAUTHORIZED;
        if challenge && !error.headers.contains_key(WWW_AUTHENTICATE) {
            error = error.header(WWW_AUTHENTICATE.as_str(), &self.challenge());
        }
        let Some(processor) = &self.error_processor else {
            return error.into_response();
        };
        let mut response = processor(&error);
        if challenge && !response.headers().contains_key(WWW_AUTHENTICATE) {
            if let Ok(value) = HeaderValue::from_str(&self.challenge()) {
                response.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
        }
        response
    }

    pub(crate) fn describe(&self, mut scheme: serde_json::Value) -> serde_json::Value {
        if let (Some(description), Some(object)) = (&self.description, scheme.as_object_mut()) {
            object.insert("description".into(), description.clone().into());
        }
        scheme
    }
}
