//! Session tokens
//!
//! Sessions are stateless HS256 JWTs carrying the user id. Role and
//! onboarding flags are deliberately not trusted from the token; the
//! request extractor reloads the user row.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::MarketplaceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user_id: &str) -> Result<String, MarketplaceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| MarketplaceError::InternalError(format!("Failed to sign session: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, MarketplaceError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| MarketplaceError::SessionError(format!("Invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    #[test]
    fn test_issued_token_verifies() {
        let keys = SessionKeys::new(SECRET, 1);
        let token = keys.issue("user-1").unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = SessionKeys::new(SECRET, 1).issue("user-1").unwrap();
        let other = SessionKeys::new("another-secret-that-is-also-long-enough", 1);
        assert!(matches!(other.verify(&token), Err(MarketplaceError::SessionError(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // jsonwebtoken allows 60s of leeway by default
        let keys = SessionKeys::new(SECRET, -1);
        let token = keys.issue("user-1").unwrap();
        assert!(keys.verify(&token).is_err());
    }
}
