use apiweave::prelude::*;
use apiweave::ConfigError;

use crate::services::{PetService, UserDirectory};

/// The `petstore` config section.
#[derive(Debug, Clone)]
pub struct PetstoreConfig {
    pub token_secret: String,
    pub token_ttl_minutes: i64,
}

impl PetstoreConfig {
    pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            token_secret: config.get_or("petstore.token_secret", "change-me".to_string())?,
            token_ttl_minutes: config.get_or("petstore.token_ttl_minutes", 60)?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pets: PetService,
    pub users: UserDirectory,
    pub issuer: TokenIssuer,
}

impl AppState {
    pub fn new(config: &PetstoreConfig, pets: PetService, users: UserDirectory) -> Self {
        let issuer = TokenIssuer::new(config.token_secret.as_bytes())
            .with_ttl(chrono::Duration::minutes(config.token_ttl_minutes));
        Self {
            pets,
            users,
            issuer,
        }
    }
}
