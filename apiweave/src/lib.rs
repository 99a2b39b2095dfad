//! apiweave: an APIFlask-style layer over Axum.
//!
//! This facade crate re-exports the apiweave sub-crates through a single
//! dependency with feature flags:
//!
//! ```ignore
//! use apiweave::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature    | Default | Crate               |
//! |------------|---------|---------------------|
//! | `openapi`  | **yes** | `apiweave-openapi`  |
//! | `security` | **yes** | `apiweave-security` |
//! | `full`     | no      | All of the above    |

pub extern crate apiweave_core;

pub use apiweave_core::*;

#[cfg(feature = "openapi")]
pub use apiweave_openapi;

#[cfg(feature = "security")]
pub use apiweave_security;

/// Unified prelude: the core prelude plus the enabled feature crates.
pub mod prelude {
    pub use apiweave_core::prelude::*;

    #[cfg(feature = "openapi")]
    pub use apiweave_openapi::{DocsUi, OpenApiConfig, OpenApiPlugin, SpecFormat, Tag};

    #[cfg(feature = "security")]
    pub use apiweave_security::prelude::*;
}
