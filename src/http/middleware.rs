//! Authentication middleware and admin guard

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::token::{verify_token, Claims, TokenError};

/// Extract JWT from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid authorization header format")]
    InvalidFormat,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Admin access required")]
    AdminRequired,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::MissingHeader => StatusCode::UNAUTHORIZED,
            AuthError::InvalidFormat => StatusCode::BAD_REQUEST,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::AdminRequired => StatusCode::FORBIDDEN,
        };

        (status, self.to_string()).into_response()
    }
}

/// Authenticated user extractor result
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.claims.admin
    }
}

/// Middleware to require authentication
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingHeader)?;

    let token = extract_bearer_token(auth_header).ok_or(AuthError::InvalidFormat)?;

    let claims = verify_token(token, &state.config.jwt_secret)?;

    let auth_user = AuthenticatedUser {
        user_id: claims.sub,
        claims,
    };

    // Insert into request extensions for handlers to access
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Middleware to require the admin claim. Must run after `require_auth`
/// so the authenticated user is already in the request extensions.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    let auth_user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or(AuthError::MissingHeader)?;

    if !auth_user.is_admin() {
        return Err(AuthError::AdminRequired);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token("Basic dXNlcg=="), None);
        assert_eq!(extract_bearer_token("bearer abc"), None);
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            AuthError::MissingHeader.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidFormat.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::AdminRequired.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
