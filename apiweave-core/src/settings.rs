use std::sync::Arc;

use crate::config::{ApiConfig, ConfigError};
use crate::schema::Schema;

/// Runtime settings of the request/response pipeline.
///
/// Read from the `apiweave` section of the configuration:
///
/// ```yaml
/// apiweave:
///   validation_error_status_code: 400
///   validation_error_description: Invalid input
///   auth_error_status_code: 401
///   base_response_data_key: data
///   json_errors: true
///   auto_tags: true
///   body_limit: 2097152
///   trace_requests: true
/// ```
///
/// `base_response_schema` cannot come from YAML; set it with
/// [`ApiSettings::base_response_schema`].
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub validation_error_status_code: u16,
    pub validation_error_description: String,
    pub auth_error_status_code: u16,
    pub base_response_schema: Option<Arc<Schema>>,
    pub base_response_data_key: String,
    pub json_errors: bool,
    pub auto_tags: bool,
    pub body_limit: usize,
    pub trace_requests: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            validation_error_status_code: 422,
            validation_error_description: "Validation error".to_string(),
            auth_error_status_code: 401,
            base_response_schema: None,
            base_response_data_key: "data".to_string(),
            json_errors: true,
            auto_tags: true,
            body_limit: 2 * 1024 * 1024,
            trace_requests: true,
        }
    }
}

impl ApiSettings {
    pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Self {
            validation_error_status_code: config.get_or(
                "apiweave.validation_error_status_code",
                defaults.validation_error_status_code,
            )?,
            validation_error_description: config.get_or(
                "apiweave.validation_error_description",
                defaults.validation_error_description,
            )?,
            auth_error_status_code: config.get_or(
                "apiweave.auth_error_status_code",
                defaults.auth_error_status_code,
            )?,
            base_response_schema: None,
            base_response_data_key: config.get_or(
                "apiweave.base_response_data_key",
                defaults.base_response_data_key,
            )?,
            json_errors: config.get_or("apiweave.json_errors", defaults.json_errors)?,
            auto_tags: config.get_or("apiweave.auto_tags", defaults.auto_tags)?,
            body_limit: config.get_or("apiweave.body_limit", defaults.body_limit)?,
            trace_requests: config.get_or("apiweave.trace_requests", defaults.trace_requests)?,
        };
        settings.check()?;
        Ok(settings)
    }

    /// Wrap every successful response body in `schema`. The handler's body
    /// must then carry the payload under
    /// [`base_response_data_key`](Self::base_response_data_key).
    pub fn base_response_schema(mut self, schema: Schema) -> Self {
        self.base_response_schema = Some(Arc::new(schema));
        self
    }

    pub fn validation_error_status_code(mut self, code: u16) -> Self {
        self.validation_error_status_code = code;
        self
    }

    pub fn auth_error_status_code(mut self, code: u16) -> Self {
        self.auth_error_status_code = code;
        self
    }

    fn check(&self) -> Result<(), ConfigError> {
        for (key, code) in [
            (
                "apiweave.validation_error_status_code",
                self.validation_error_status_code,
            ),
            ("apiweave.auth_error_status_code", self.auth_error_status_code),
        ] {
            if !(400..=599).contains(&code) {
                return Err(ConfigError::Invalid {
                    key: key.to_string(),
                    message: format!("{code} is not an error status code"),
                });
            }
        }
        Ok(())
    }
}
