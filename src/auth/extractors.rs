use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::models::user::User;

/// The identity resolved by `AuthMiddleware` for the current request: the
/// full user record plus the exact token the request authenticated with.
/// Keeping the raw token around lets `POST /users/logout` revoke precisely
/// the session in use.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

impl FromRequest for AuthSession {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthSession>().cloned() {
            Some(session) => ready(Ok(session)),
            // Only reachable if a protected handler is registered without
            // AuthMiddleware in front of it; failing closed keeps the
            // response indistinguishable from a missing token.
            None => {
                let err = AppError::Unauthorized("Please authenticate.".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
