//! Session tokens and principal resolution.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use growthwatch_core::ManagerId;

use crate::{Principal, SessionClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed session token: {0}")]
    Malformed(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to issue session token: {0}")]
    Issue(String),

    #[error("principal lookup failed: {0}")]
    Lookup(String),
}

/// Verifies a bearer token and yields its claims.
pub trait SessionValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError>;
}

/// Resolves a session token to the current principal (`None` when the token
/// is invalid or the principal no longer exists).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn resolve_principal(&self, token: &str) -> Result<Option<Principal>, SessionError>;
}

/// HS256-signed session tokens.
#[derive(Clone)]
pub struct Hs256SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256SessionCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, sub: ManagerId, now: DateTime<Utc>) -> Result<String, SessionError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| SessionError::Issue("session expiry out of range".to_string()))?;
        let claims = SessionClaims {
            sub,
            issued_at: now,
            expires_at,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SessionError::Issue(e.to_string()))
    }
}

impl core::fmt::Debug for Hs256SessionCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256SessionCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionValidator for Hs256SessionCodec {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError> {
        // Expiry lives in our own claim names; check it with `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates() {
        let codec = Hs256SessionCodec::new(b"secret", Duration::minutes(10));
        let sub = ManagerId::new();
        let now = Utc::now();
        let token = codec.issue(sub, now).unwrap();
        let claims = codec.validate(&token, now).unwrap();
        assert_eq!(claims.sub, sub);
    }

    #[test]
    fn expiry_overflow_is_an_issue_error() {
        let codec = Hs256SessionCodec::new(b"secret", Duration::days(365));
        assert!(matches!(
            codec.issue(ManagerId::new(), DateTime::<Utc>::MAX_UTC),
            Err(SessionError::Issue(_))
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let a = Hs256SessionCodec::new(b"secret-a", Duration::minutes(10));
        let b = Hs256SessionCodec::new(b"secret-b", Duration::minutes(10));
        let token = a.issue(ManagerId::new(), Utc::now()).unwrap();
        assert!(matches!(
            b.validate(&token, Utc::now()),
            Err(SessionError::Malformed(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = Hs256SessionCodec::new(b"secret", Duration::minutes(1));
        let issued = Utc::now() - Duration::minutes(5);
        let token = codec.issue(ManagerId::new(), issued).unwrap();
        assert!(matches!(
            codec.validate(&token, Utc::now()),
            Err(SessionError::Claims(TokenValidationError::Expired))
        ));
    }
}
