//! Identity tokens: HS256-signed JWTs carrying a user id.
//!
//! Tokens live for seven days. There is no refresh or revocation; logging
//! out means the client drops the token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub const TOKEN_LIFETIME_DAYS: i64 = 7;

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Token is malformed")]
    Malformed,
    #[error("Token expired")]
    Expired,
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token signing failed")]
    Signing,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: i64,
    iat: i64,
    exp: i64,
}

/// Issues and verifies identity tokens with a process-wide signing key.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenService {
    /// Build the service from the configured secret. An empty secret is a
    /// startup error.
    pub fn new(secret: &[u8]) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime: Duration::days(TOKEN_LIFETIME_DAYS),
        })
    }

    pub fn issue(&self, user_id: i64) -> Result<String, AuthError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if it were created at `issued_at`.
    pub fn issue_at(&self, user_id: i64, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign identity token");
            AuthError::Signing
        })
    }

    /// Resolve a token to the user id it was issued for.
    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.user_id)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed,
            })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"test-signing-secret").unwrap()
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let tokens = service();
        for user_id in [1, 42, i64::MAX] {
            let token = tokens.issue(user_id).unwrap();
            assert_eq!(tokens.verify(&token), Ok(user_id));
        }
    }

    #[test]
    fn token_valid_until_end_of_lifetime() {
        let tokens = service();
        let issued = Utc::now() - Duration::days(TOKEN_LIFETIME_DAYS) + Duration::minutes(5);
        let token = tokens.issue_at(9, issued).unwrap();
        assert_eq!(tokens.verify(&token), Ok(9));
    }

    #[test]
    fn token_past_expiry_is_expired() {
        let tokens = service();
        let issued = Utc::now() - Duration::days(TOKEN_LIFETIME_DAYS + 1);
        let token = tokens.issue_at(9, issued).unwrap();
        assert_eq!(tokens.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn token_from_other_key_has_invalid_signature() {
        let other = TokenService::new(b"someone-else").unwrap();
        let token = other.issue(5).unwrap();
        assert_eq!(service().verify(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn swapped_payload_has_invalid_signature() {
        let tokens = service();
        let mine = tokens.issue(1).unwrap();
        let theirs = tokens.issue(2).unwrap();

        let mine_parts: Vec<&str> = mine.split('.').collect();
        let theirs_parts: Vec<&str> = theirs.split('.').collect();
        let forged = format!("{}.{}.{}", mine_parts[0], theirs_parts[1], mine_parts[2]);

        assert_eq!(tokens.verify(&forged), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let tokens = service();
        for bad in ["", "not-a-token", "a.b.c", "Bearer xyz"] {
            assert_eq!(tokens.verify(bad), Err(AuthError::Malformed), "input {bad:?}");
        }
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            TokenService::new(b""),
            Err(ConfigError::MissingJwtSecret)
        ));
    }
}
