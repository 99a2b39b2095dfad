use apiweave_core::http::StatusCode;
use apiweave_core::HttpError;

/// Failures of credential extraction and token handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// The request carries no credentials for the scheme.
    MissingCredentials,
    /// The `Authorization` header uses another scheme, or is malformed.
    InvalidAuthScheme,
    /// The token is malformed or its signature does not verify.
    InvalidToken(String),
    /// The token's `exp` is in the past.
    TokenExpired,
    /// A token could not be issued.
    Issue(String),
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::MissingCredentials => write!(f, "Missing credentials"),
            SecurityError::InvalidAuthScheme => write!(f, "Invalid authorization scheme"),
            SecurityError::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
            SecurityError::TokenExpired => write!(f, "Token expired"),
            SecurityError::Issue(msg) => write!(f, "Failed to issue token: {msg}"),
        }
    }
}

impl std::error::Error for SecurityError {}

impl From<SecurityError> for HttpError {
    /// Clients only learn that authentication failed, never which check
    /// rejected them.
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::Issue(msg) => HttpError::internal(msg),
            _ => HttpError::new(StatusCode::UNAUTHORIZED),
        }
    }
}
