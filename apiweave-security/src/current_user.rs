use apiweave_core::http::extract::{FromRequestParts, OptionalFromRequestParts};
use apiweave_core::http::{Parts, StatusCode};
use apiweave_core::HttpError;

/// The principal resolved by an auth adapter for the current request.
///
/// Only routes declared with `auth_required` carry one; on other routes the
/// extractor rejects with 401. With optional authentication, take
/// `Option<CurrentUser<P>>` instead.
///
/// ```ignore
/// async fn protected(CurrentUser(user): CurrentUser<User>) -> Reply {
///     Reply::new(json!({"message": format!("Hello, {}!", user.name)}))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser<P>(pub P);

impl<P> std::ops::Deref for CurrentUser<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.0
    }
}

impl<P, S> FromRequestParts<S> for CurrentUser<P>
where
    P: Clone + Send + Sync + 'static,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser<P>>().cloned().ok_or_else(|| {
            tracing::warn!(
                uri = %parts.uri,
                principal = std::any::type_name::<P>(),
                "No authenticated principal on this request"
            );
            HttpError::new(StatusCode::UNAUTHORIZED)
        })
    }
}

impl<P, S> OptionalFromRequestParts<S> for CurrentUser<P>
where
    P: Clone + Send + Sync + 'static,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser<P>>().cloned())
    }
}
