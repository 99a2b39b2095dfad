use std::sync::Arc;

use serde_json::Value;

use crate::error::HttpError;
use crate::http::{Parts, Response};

/// Result of checking the credentials of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials were verified. The principal has been stored in the
    /// request extensions; `roles` are the roles it holds.
    Authenticated { roles: Vec<String> },
    /// The request carried no credentials for this scheme.
    Missing,
    /// Credentials were present but did not verify.
    Rejected,
}

/// An authentication adapter usable with
/// [`Route::auth_required`](crate::route::Route::auth_required).
///
/// Implementations extract credentials from the request head, run the
/// verification capability they were built with, and store the resolved
/// principal in `parts.extensions`. Verification is synchronous: it must not
/// perform blocking I/O.
pub trait AuthScheme: Send + Sync + 'static {
    /// Name of the OpenAPI security scheme (`BasicAuth`, `BearerAuth`, ...).
    fn scheme_name(&self) -> &str;

    /// The OpenAPI security scheme object.
    fn security_scheme(&self) -> Value;

    fn authenticate(&self, parts: &mut Parts) -> AuthOutcome;

    /// Render an authentication or authorization failure. Adapters add their
    /// challenge header and apply their own error processor here.
    fn error_response(&self, error: HttpError) -> Response;
}

/// `auth_required` options for one route.
#[derive(Clone)]
pub struct AuthRequirement {
    pub scheme: Arc<dyn AuthScheme>,
    /// The principal must hold at least one of these roles.
    pub roles: Vec<String>,
    /// Let requests without valid credentials through, without a principal.
    pub optional: bool,
}

impl AuthRequirement {
    pub fn new<A: AuthScheme>(scheme: A) -> Self {
        Self::shared(Arc::new(scheme))
    }

    pub fn shared(scheme: Arc<dyn AuthScheme>) -> Self {
        Self {
            scheme,
            roles: Vec::new(),
            optional: false,
        }
    }

    pub fn roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn scheme_name(&self) -> &str {
        self.scheme.scheme_name()
    }
}

impl std::fmt::Debug for AuthRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequirement")
            .field("scheme", &self.scheme.scheme_name())
            .field("roles", &self.roles)
            .field("optional", &self.optional)
            .finish()
    }
}

impl<A: AuthScheme> From<A> for AuthRequirement {
    fn from(scheme: A) -> Self {
        AuthRequirement::new(scheme)
    }
}

impl From<Arc<dyn AuthScheme>> for AuthRequirement {
    fn from(scheme: Arc<dyn AuthScheme>) -> Self {
        AuthRequirement::shared(scheme)
    }
}
