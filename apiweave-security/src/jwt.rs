//! Signed bearer tokens.
//!
//! [`TokenIssuer`] signs short-lived HS256 JWTs and verifies them again, so it
//! can back both a login endpoint and an [`HttpTokenAuth`](crate::HttpTokenAuth).

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SecurityError;
use crate::token::VerifyToken;

/// Claims carried by an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    inner: Arc<IssuerInner>,
}

struct IssuerInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    issuer: Option<String>,
}

impl TokenIssuer {
    /// Issuer signing with `secret`; tokens are valid for one hour.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self::build(secret.as_ref(), Duration::hours(1), None)
    }

    fn build(secret: &[u8], ttl: Duration, issuer: Option<String>) -> Self {
        Self {
            inner: Arc::new(IssuerInner {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                ttl,
                issuer,
            }),
        }
    }

    pub fn with_ttl(self, ttl: Duration) -> Self {
        self.map(|inner| inner.ttl = ttl)
    }

    /// Set and require the `iss` claim.
    pub fn with_issuer(self, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        self.map(|inner| inner.issuer = Some(issuer))
    }

    fn map(self, f: impl FnOnce(&mut IssuerInner)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => IssuerInner {
                encoding: shared.encoding.clone(),
                decoding: shared.decoding.clone(),
                ttl: shared.ttl,
                issuer: shared.issuer.clone(),
            },
        };
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn issue<I, R>(&self, sub: impl Into<String>, roles: I) -> Result<String, SecurityError>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.into(),
            exp: (now + self.inner.ttl).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            iss: self.inner.issuer.clone(),
            roles: roles.into_iter().map(Into::into).collect(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.inner.encoding)
            .map_err(|e| SecurityError::Issue(e.to_string()))?;
        debug!(sub = %claims.sub, jti = %claims.jti, "Token issued");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, SecurityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        if let Some(issuer) = &self.inner.issuer {
            validation.set_issuer(&[issuer]);
            validation.set_required_spec_claims(&["exp", "iss"]);
        }
        let data = decode::<Claims>(token, &self.inner.decoding, &validation).map_err(|e| {
            let err = match e.kind() {
                ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
                _ => SecurityError::InvalidToken(e.to_string()),
            };
            warn!(error = %err, "JWT validation failed");
            err
        })?;
        Ok(data.claims)
    }
}

impl VerifyToken<Claims> for TokenIssuer {
    fn verify(&self, token: &str) -> Option<Claims> {
        TokenIssuer::verify(self, token).ok()
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.inner.ttl)
            .field("issuer", &self.inner.issuer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"apiweave-test-secret";

    #[test]
    fn issued_token_verifies() {
        let issuer = TokenIssuer::new(SECRET);
        let token = issuer.issue("alice", ["admin"]).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(claims.has_role("admin"));
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.jti.len(), 36);
    }

    #[test]
    fn expired_token_is_reported() {
        let issuer = TokenIssuer::new(SECRET).with_ttl(Duration::minutes(-5));
        let token = issuer.issue("alice", Vec::<String>::new()).unwrap();
        assert_eq!(issuer.verify(&token), Err(SecurityError::TokenExpired));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = TokenIssuer::new(b"other").issue("bob", ["user"]).unwrap();
        let err = TokenIssuer::new(SECRET).verify(&token).unwrap_err();
        assert!(matches!(err, SecurityError::InvalidToken(_)));
    }

    #[test]
    fn issuer_claim_is_required_when_configured() {
        let plain = TokenIssuer::new(SECRET).issue("carol", ["user"]).unwrap();
        let strict = TokenIssuer::new(SECRET).with_issuer("petstore");
        assert!(matches!(
            strict.verify(&plain),
            Err(SecurityError::InvalidToken(_))
        ));
        let foreign = TokenIssuer::new(SECRET)
            .with_issuer("elsewhere")
            .issue("carol", ["user"])
            .unwrap();
        assert!(strict.verify(&foreign).is_err());
        let token = strict.issue("carol", ["user"]).unwrap();
        assert_eq!(strict.verify(&token).unwrap().iss.as_deref(), Some("petstore"));
    }
}
