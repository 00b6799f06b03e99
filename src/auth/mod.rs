pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};

use crate::models::user::User;

// Re-export necessary items
pub use extractors::AuthSession;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims};

/// Payload for a login request.
///
/// Deliberately not validated beyond deserialization: a malformed email and
/// an unknown email must be indistinguishable, so both fall through to the
/// credential lookup and fail with the same generic error.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn normalize(&mut self) {
        self.email = self.email.trim().to_lowercase();
        self.password = self.password.trim().to_string();
    }
}

/// Response body after successful registration or login: the user's public
/// view plus the freshly issued session token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}
