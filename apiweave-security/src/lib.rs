//! Authentication adapters for apiweave routes.
//!
//! [`HttpBasicAuth`] and [`HttpTokenAuth`] implement
//! [`AuthScheme`](apiweave_core::AuthScheme): attach them with
//! `Route::auth_required`, read the principal back with [`CurrentUser`], and
//! the OpenAPI plugin documents them as security schemes.

mod adapter;
pub mod basic;
pub mod credentials;
pub mod current_user;
pub mod error;
pub mod jwt;
pub mod token;

pub use adapter::AuthErrorProcessor;
pub use basic::{HttpBasicAuth, VerifyPassword};
pub use credentials::BasicCredentials;
pub use current_user::CurrentUser;
pub use error::SecurityError;
pub use jwt::{Claims, TokenIssuer};
pub use token::{HttpTokenAuth, VerifyToken};

pub mod prelude {
    pub use crate::{
        Claims, CurrentUser, HttpBasicAuth, HttpTokenAuth, SecurityError, TokenIssuer,
    };
}
