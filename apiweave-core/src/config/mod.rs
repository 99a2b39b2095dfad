mod loader;
pub mod value;

use std::collections::HashMap;
use std::path::Path;

pub use value::{ConfigValue, FromConfigValue};

/// Failure to read or interpret configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No value under this key.
    NotFound(String),
    TypeMismatch { key: String, expected: &'static str },
    /// A file could not be read or is not valid YAML.
    Load(String),
    /// The value has the right type but is out of range.
    Invalid { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "missing config key `{key}`"),
            Self::TypeMismatch { key, expected } => {
                write!(f, "config key `{key}` is not a valid {expected}")
            }
            Self::Load(reason) => write!(f, "cannot load configuration: {reason}"),
            Self::Invalid { key, message } => write!(f, "config key `{key}`: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// `apiweave.body_limit`, `APIWEAVE_BODY_LIMIT` and `apiweave.body.limit`
/// are the same key.
pub(crate) fn normalize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c == '_' { '.' } else { c.to_ascii_lowercase() })
        .collect()
}

const ENV_PREFIX: &str = "APIWEAVE_";

/// Flat key/value view over YAML files and the environment.
///
/// Later layers win:
///
/// | layer | source |
/// |-------|--------|
/// | 1 | `apiweave.yaml` |
/// | 2 | `apiweave-{profile}.yaml` |
/// | 3 | `APIWEAVE_*` variables, after `.env` and `.env.{profile}` were loaded without overriding the real environment |
///
/// Variables keep their prefix: `APIWEAVE_OPENAPI_TITLE` overrides
/// `apiweave.openapi.title`, and keys outside `apiweave.*` are never
/// overridden from the environment.
///
/// `APIWEAVE_PROFILE`, when set, replaces the profile passed to [`ApiConfig::load`].
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    values: loader::Values,
    profile: String,
}

impl ApiConfig {
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile)
    }

    /// [`ApiConfig::load`] with files resolved against `dir`.
    pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let profile = std::env::var("APIWEAVE_PROFILE").unwrap_or_else(|_| profile.to_owned());
        let mut config = Self::with_profile(&profile);

        for file in ["apiweave.yaml".to_owned(), format!("apiweave-{profile}.yaml")] {
            loader::load_yaml_file(&dir.join(file), &mut config.values)?;
        }
        for file in [".env".to_owned(), format!(".env.{profile}")] {
            if dotenvy::from_path(dir.join(&file)).is_ok() {
                tracing::debug!(file = %file, "Loaded dotenv file");
            }
        }
        config.values.extend(
            std::env::vars()
                .filter(|(name, _)| name.starts_with(ENV_PREFIX))
                .map(|(name, value)| (normalize_key(&name), ConfigValue::String(value))),
        );

        tracing::info!(profile = %config.profile, keys = config.values.len(), "Configuration loaded");
        Ok(config)
    }

    /// Config from one YAML document, ignoring files and the environment.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::empty();
        loader::load_yaml_str(yaml, &mut config.values)?;
        Ok(config)
    }

    /// No keys at all; typed sections use their defaults.
    pub fn empty() -> Self {
        Self::with_profile("test")
    }

    fn with_profile(profile: &str) -> Self {
        Self {
            values: HashMap::new(),
            profile: profile.to_owned(),
        }
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(normalize_key(key), value);
    }

    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        match self.values.get(&normalize_key(key)) {
            Some(value) => V::from_config_value(value, key),
            None => Err(ConfigError::NotFound(key.to_owned())),
        }
    }

    /// `default` applies to a missing key only; a malformed value is an error.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> Result<V, ConfigError> {
        self.get(key).or_else(|e| match e {
            ConfigError::NotFound(_) => Ok(default),
            e => Err(e),
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(&normalize_key(key))
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}
