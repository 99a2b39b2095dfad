//! Extractors handing validated inputs to handlers.
//!
//! Each extractor reads the data validated for its location and
//! deserializes it into the handler's type. They only read the request
//! head, so a handler can take several of them in any order.

use serde::de::DeserializeOwned;

use super::ValidatedInputs;
use crate::error::HttpError;
use crate::http::{FromRequestParts, Parts};
use crate::route::Location;

fn extract_validated<T: DeserializeOwned>(
    parts: &mut Parts,
    location: Location,
) -> Result<T, HttpError> {
    let value = parts
        .extensions
        .get_mut::<ValidatedInputs>()
        .and_then(|inputs| inputs.take(location));
    let Some(value) = value else {
        tracing::error!(
            %location,
            path = %parts.uri.path(),
            "Handler extracts an input the route does not declare"
        );
        return Err(HttpError::internal("Internal Server Error"));
    };
    serde_json::from_value(value).map_err(|err| {
        tracing::error!(%location, error = %err, "Validated input does not fit the handler type");
        HttpError::internal("Internal Server Error")
    })
}

macro_rules! location_extractor {
    ($(#[$doc:meta])* $name:ident, $location:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name<T>(pub T);

        impl<T, S> FromRequestParts<S> for $name<T>
        where
            T: DeserializeOwned + Send,
            S: Send + Sync,
        {
            type Rejection = HttpError;

            async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
                extract_validated(parts, $location).map($name)
            }
        }

        impl<T> std::ops::Deref for $name<T> {
            type Target = T;

            fn deref(&self) -> &T {
                &self.0
            }
        }
    };
}

location_extractor!(
    /// The validated JSON body.
    JsonBody,
    Location::Json
);
location_extractor!(
    /// The validated query string.
    QueryArgs,
    Location::Query
);
location_extractor!(
    /// The validated url-encoded form body.
    FormBody,
    Location::Form
);
location_extractor!(
    /// The validated multipart body. File fields deserialize into
    /// [`UploadedFile`](super::UploadedFile).
    FileBody,
    Location::Files
);
location_extractor!(JsonOrFormBody, Location::JsonOrForm);
location_extractor!(PathArgs, Location::Path);
location_extractor!(HeaderArgs, Location::Headers);
location_extractor!(CookieArgs, Location::Cookies);
