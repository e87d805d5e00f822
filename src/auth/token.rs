//! Access token issuance and verification (HS256)

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Account email
    pub email: String,
    /// Admin flag - gates the /admin routes
    #[serde(default)]
    pub admin: bool,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Token response returned after register/login
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Sign a new access token for a user
pub fn issue_token(
    user_id: Uuid,
    email: &str,
    admin: bool,
    secret: &str,
    ttl_hours: i64,
) -> Result<TokenResponse, TokenError> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(ttl_hours);

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        admin,
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| TokenError::Signing)?;

    Ok(TokenResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in: ttl_hours * 3600,
    })
}

/// Verify a token signature and expiry, returning the claims
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;

    Ok(data.claims)
}

/// Token errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to sign token")]
    Signing,

    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-tests-only-32b";

    #[test]
    fn issue_and_verify_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, "shopper@example.com", false, SECRET, 24).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 86400);

        let claims = verify_token(&token.access_token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "shopper@example.com");
        assert!(!claims.admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn admin_claim_survives_roundtrip() {
        let token = issue_token(Uuid::new_v4(), "admin@example.com", true, SECRET, 1).unwrap();
        let claims = verify_token(&token.access_token, SECRET).unwrap();
        assert!(claims.admin);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue_token(Uuid::new_v4(), "a@example.com", false, SECRET, 1).unwrap();
        let err = verify_token(&token.access_token, "a-different-secret").unwrap_err();
        assert!(matches!(err, TokenError::Invalid));
    }

    #[test]
    fn tampered_token_rejected() {
        let token = issue_token(Uuid::new_v4(), "a@example.com", false, SECRET, 1).unwrap();
        let mut tampered = token.access_token.clone();
        // Flip a character in the payload segment
        let mid = tampered.len() / 2;
        let replacement = if tampered.as_bytes()[mid] == b'A' { "B" } else { "A" };
        tampered.replace_range(mid..mid + 1, replacement);
        assert!(verify_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        // Negative TTL backdates the expiry past the default leeway
        let token = issue_token(Uuid::new_v4(), "a@example.com", false, SECRET, -2).unwrap();
        let err = verify_token(&token.access_token, SECRET).unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }
}
