//! Credential extraction from request headers.

use apiweave_core::http::{Parts, AUTHORIZATION};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::SecurityError;

/// Username and password of a `Basic` authorization header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Split `"<scheme> <credentials>"`, comparing the scheme case-insensitively.
fn split_scheme<'a>(value: &'a str, scheme: &str) -> Result<&'a str, SecurityError> {
    let (given, rest) = value
        .split_once(' ')
        .ok_or(SecurityError::InvalidAuthScheme)?;
    if !given.eq_ignore_ascii_case(scheme) {
        return Err(SecurityError::InvalidAuthScheme);
    }
    Ok(rest.trim())
}

fn authorization(parts: &Parts) -> Result<&str, SecurityError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(SecurityError::MissingCredentials)?
        .to_str()
        .map_err(|_| SecurityError::InvalidAuthScheme)
}

/// Read `Authorization: <scheme> base64(username:password)`.
pub fn basic_credentials(parts: &Parts, scheme: &str) -> Result<BasicCredentials, SecurityError> {
    let encoded = split_scheme(authorization(parts)?, scheme)?;
    let decoded = STANDARD
        .decode(encoded)
        .map_err(|_| SecurityError::InvalidAuthScheme)?;
    let decoded = String::from_utf8(decoded).map_err(|_| SecurityError::InvalidAuthScheme)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or(SecurityError::InvalidAuthScheme)?;
    Ok(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Read `Authorization: <scheme> <token>`.
pub fn bearer_token<'a>(parts: &'a Parts, scheme: &str) -> Result<&'a str, SecurityError> {
    let token = split_scheme(authorization(parts)?, scheme)?;
    if token.is_empty() {
        return Err(SecurityError::InvalidAuthScheme);
    }
    Ok(token)
}

/// Read a raw token from a custom header such as `X-API-Key`.
pub fn header_token<'a>(parts: &'a Parts, header: &str) -> Result<&'a str, SecurityError> {
    let value = parts
        .headers
        .get(header)
        .ok_or(SecurityError::MissingCredentials)?
        .to_str()
        .map_err(|_| SecurityError::InvalidAuthScheme)?
        .trim();
    if value.is_empty() {
        return Err(SecurityError::MissingCredentials);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(header: Option<(&str, &str)>) -> Parts {
        let mut builder = http::Request::builder().uri("/");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn basic_header_is_decoded() {
        let encoded = STANDARD.encode("john:secret:with:colons");
        let parts = parts(Some(("authorization", &format!("Basic {encoded}"))));
        let creds = basic_credentials(&parts, "Basic").unwrap();
        assert_eq!(creds.username, "john");
        assert_eq!(creds.password, "secret:with:colons");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let parts = parts(Some(("authorization", "bearer abc")));
        assert_eq!(bearer_token(&parts, "Bearer").unwrap(), "abc");
    }

    #[test]
    fn wrong_scheme_and_missing_header() {
        let parts_basic = parts(Some(("authorization", "Basic abc")));
        assert_eq!(
            bearer_token(&parts_basic, "Bearer"),
            Err(SecurityError::InvalidAuthScheme)
        );
        let empty = parts(None);
        assert_eq!(bearer_token(&empty, "Bearer"), Err(SecurityError::MissingCredentials));
        assert_eq!(header_token(&empty, "x-api-key"), Err(SecurityError::MissingCredentials));
    }

    #[test]
    fn garbage_basic_payload_is_rejected() {
        let parts = parts(Some(("authorization", "Basic !!!")));
        assert_eq!(
            basic_credentials(&parts, "Basic"),
            Err(SecurityError::InvalidAuthScheme)
        );
    }
}
