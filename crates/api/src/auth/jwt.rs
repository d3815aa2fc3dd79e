//! JWT token generation and validation

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Default token lifetime when the caller does not specify one. Distinct
/// from the configurable access-token lifetime used at login.
const DEFAULT_TTL: Duration = Duration::minutes(15);

/// JWT claims structure for NoteHub-issued tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// JWT manager for token operations
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// Create a new JWT manager
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a signed token binding `subject` for `ttl` (default 15 minutes).
    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl.unwrap_or(DEFAULT_TTL);

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };

        // Explicit algorithm prevents algorithm confusion attacks
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Validate a token and return its subject.
    pub fn verify(&self, token: &str) -> Result<String, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60; // 60 second clock skew tolerance

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.sub)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::Invalid,
                _ => JwtError::Validation(e.to_string()),
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error("Token validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret-key-at-least-32-chars!")
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let jwt = manager();
        let token = jwt.issue("alice", None).expect("Failed to issue token");
        let subject = jwt.verify(&token).expect("Invalid token");
        assert_eq!(subject, "alice");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = manager();
        // Expired well past the 60s clock-skew leeway.
        let token = jwt
            .issue("alice", Some(Duration::minutes(-5)))
            .expect("Failed to issue token");
        assert!(matches!(jwt.verify(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let jwt = manager();
        let token = jwt.issue("alice", None).expect("Failed to issue token");

        let other = JwtManager::new("another-secret-key-of-enough-len!");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(manager().verify("not.a.jwt").is_err());
    }
}
