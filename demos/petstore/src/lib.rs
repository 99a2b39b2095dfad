//! A pet store served with apiweave: validated pets CRUD with pagination,
//! bearer and basic authentication, file uploads and generated docs.

pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use apiweave::prelude::*;
use apiweave::ConfigError;

use crate::services::{Account, PetService, UserDirectory};
use crate::state::{AppState, PetstoreConfig};

/// Assemble the application from `config` and the given stores.
pub fn build_app(
    config: &ApiConfig,
    pets: PetService,
    users: UserDirectory,
) -> Result<ApiApp<AppState>, ConfigError> {
    let petstore = PetstoreConfig::from_config(config)?;
    let state = AppState::new(&petstore, pets, users.clone());

    let token = HttpTokenAuth::new(state.issuer.clone())
        .roles(|claims: &Claims| claims.roles.clone())
        .description("Token from POST /tokens");
    let basic = HttpBasicAuth::new(move |username: &str, password: &str| {
        users.verify(username, password)
    })
    .roles(|account: &Account| account.roles.clone());
    let admin = AuthRequirement::new(token.clone()).roles(["admin"]);

    let openapi = OpenApiConfig::from_config(config)?;
    let app = ApiApp::with_state(state)
        .with_config(config)?
        .group(routes::pets::routes(admin))
        .group(routes::auth::routes(&token, &basic))
        .group(routes::files::routes())
        .with(OpenApiPlugin::new(openapi));
    Ok(app)
}
