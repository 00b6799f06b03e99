use crate::error::AppError;
use bcrypt::{hash, verify};
use validator::ValidationError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, 12)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

/// Rejects passwords that contain the substring "password" in any casing.
/// Wired into the input structs as a custom `validator` rule.
pub fn password_policy(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        let mut error = ValidationError::new("password_policy");
        error.message = Some("Password cannot contain \"password\"".into());
        return Err(error);
    }
    Ok(())
}
