use crate::error::AppError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims encoded within a session token.
///
/// Tokens carry no expiry: a token stays valid until it is removed from its
/// user's session list by a logout. `iat` keeps tokens from separate logins
/// distinct from each other.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's unique identifier.
    pub sub: i32,
    /// Timestamp (seconds since epoch) at which the token was issued.
    pub iat: i64,
}

/// Generates a signed session token for a given user ID.
///
/// Requires the `JWT_SECRET` environment variable to be set for signing.
/// The caller is responsible for persisting the token to the user's session
/// list; an unpersisted token will not authenticate.
pub fn generate_token(user_id: i32) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        iat: chrono::Utc::now().timestamp(),
    };

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::InternalServerError("JWT_SECRET not set".into()))?;

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies a token's signature and decodes its claims.
///
/// Only the signature is checked here; whether the token is still in the
/// user's session list is the caller's responsibility.
/// Returns `AppError::Unauthorized` for malformed input or a signature
/// mismatch, and `AppError::InternalServerError` if `JWT_SECRET` is not set.
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::InternalServerError("JWT_SECRET not set".into()))?;

    // Tokens are issued without an expiry claim, so expiry validation must
    // be off or every token would be rejected as incomplete.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}
