//! Session token generation and validation.
//!
//! Sessions minted by auth-faucet redemption are HS256-signed JWTs containing
//! a [`SessionClaims`] payload. They are signed with the primary signing
//! secret and carry a unique `jti` claim so individual sessions can be traced
//! in the ledger.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sigil_core::types::DbId;
use uuid::Uuid;

/// JWT claims embedded in every session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique session identifier (UUID v4).
    pub jti: String,
}

/// Generate an HS256 session token for the given user.
pub fn generate_session_token(
    user_id: DbId,
    secret: &str,
    ttl_mins: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let exp = now + ttl_mins * 60;

    let claims = SessionClaims {
        sub: user_id,
        exp,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate and decode a session token, returning the embedded [`SessionClaims`].
///
/// Validates the signature and expiration automatically.
pub fn validate_session_token(
    token: &str,
    secret: &str,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

    #[test]
    fn test_generate_and_validate_session_token() {
        let token = generate_session_token(42, SECRET, 60).expect("generation should succeed");

        let claims = validate_session_token(&token, SECRET).expect("validation should succeed");
        assert_eq!(claims.sub, 42);
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_expired_session_fails() {
        // Manually create an already-expired token.
        // Use a margin well beyond the default 60-second leeway.
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: 1,
            exp: now - 300,
            iat: now - 600,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("encoding should succeed");

        let result = validate_session_token(&token, SECRET);
        assert!(result.is_err(), "expired session must fail validation");
    }

    #[test]
    fn test_different_secrets_fail() {
        let token = generate_session_token(1, "secret-alpha", 60).expect("generation should succeed");

        let result = validate_session_token(&token, "secret-bravo");
        assert!(
            result.is_err(),
            "token signed with a different secret must fail"
        );
    }
}
