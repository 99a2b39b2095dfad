//! The per-route request/response pipeline.
//!
//! Every registered route is wrapped in [`route_pipeline`], which runs the
//! route's authentication requirement, validates its declared inputs, calls
//! the handler and shapes the [`Reply`] through the output schema.

mod extract;
mod input;
mod multipart;
mod output;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

pub use extract::{
    CookieArgs, FileBody, FormBody, HeaderArgs, JsonBody, JsonOrFormBody, PathArgs, QueryArgs,
};
pub use multipart::UploadedFile;
pub use output::Reply;

use crate::auth::{AuthOutcome, AuthRequirement};
use crate::error::HttpError;
use crate::http::extract::{Request, State};
use crate::http::middleware::Next;
use crate::http::response::Response;
use crate::http::{Parts, StatusCode};
use crate::route::{Location, RouteMeta};
use crate::settings::ApiSettings;

/// Shared, read-only state of one route's pipeline.
pub(crate) struct RouteContext {
    pub(crate) meta: Arc<RouteMeta>,
    pub(crate) settings: Arc<ApiSettings>,
}

/// Validated data per input location, stored in the request extensions.
#[derive(Debug, Clone, Default)]
pub struct ValidatedInputs {
    inner: HashMap<Location, Value>,
}

impl ValidatedInputs {
    pub(crate) fn insert(&mut self, location: Location, value: Value) {
        self.inner.insert(location, value);
    }

    pub fn get(&self, location: Location) -> Option<&Value> {
        self.inner.get(&location)
    }

    pub(crate) fn take(&mut self, location: Location) -> Option<Value> {
        self.inner.remove(&location)
    }
}

pub(crate) async fn route_pipeline(
    State(ctx): State<Arc<RouteContext>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    if let Some(requirement) = &ctx.meta.auth {
        if let Err(response) = authorize(&ctx, requirement, &mut parts) {
            return response;
        }
    }

    let body = match input::validate_inputs(&ctx, &mut parts, body).await {
        Ok(body) => body,
        Err(error) => return crate::http::IntoResponse::into_response(error),
    };

    let response = output::in_pipeline(next.run(Request::from_parts(parts, body))).await;
    output::finish(&ctx, response)
}

fn authorize(
    ctx: &RouteContext,
    requirement: &AuthRequirement,
    parts: &mut Parts,
) -> Result<(), Response> {
    let scheme = &requirement.scheme;
    let reason = match scheme.authenticate(parts) {
        AuthOutcome::Authenticated { roles } => {
            let allowed = requirement.roles.is_empty()
                || requirement.roles.iter().any(|role| roles.contains(role));
            if allowed {
                return Ok(());
            }
            tracing::warn!(
                scheme = scheme.scheme_name(),
                route = %ctx.meta.path,
                required = ?requirement.roles,
                "Principal lacks the required role"
            );
            return Err(scheme.error_response(HttpError::new(StatusCode::FORBIDDEN)));
        }
        _ if requirement.optional => return Ok(()),
        AuthOutcome::Missing => "missing credentials",
        AuthOutcome::Rejected => "invalid credentials",
    };
    tracing::warn!(
        scheme = scheme.scheme_name(),
        route = %ctx.meta.path,
        reason,
        "Authentication failed"
    );
    let status = StatusCode::from_u16(ctx.settings.auth_error_status_code)
        .unwrap_or(StatusCode::UNAUTHORIZED);
    Err(scheme.error_response(HttpError::new(status)))
}
