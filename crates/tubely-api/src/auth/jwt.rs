//! HS256 access tokens
//!
//! Tokens are signed with the shared `JWT_SECRET`. The subject is the user id
//! and the issuer is fixed, so tokens minted for other purposes are refused.

use crate::auth::models::AccessClaims;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tubely_core::AppError;
use uuid::Uuid;

pub const ACCESS_TOKEN_ISSUER: &str = "tubely-access";

/// Mint an access token for `user_id` valid for `ttl`.
pub fn issue_access_token(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user_id,
        iss: ACCESS_TOKEN_ISSUER.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))
}

/// Verify signature, issuer and expiry; return the user id.
pub fn validate_access_token(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ACCESS_TOKEN_ISSUER]);

    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Access token rejected");
        AppError::Unauthorized("Couldn't validate JWT".to_string())
    })?;

    Ok(data.claims.sub)
}
