use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::PgPool;
use std::rc::Rc;

use crate::auth::extractors::AuthSession;
use crate::auth::token::verify_token;
use crate::error::AppError;
use crate::store;

/// Request-pipeline stage that resolves a bearer token to a user identity.
///
/// A request passes only if the token's signature verifies *and* the exact
/// token is still present in the user's session list, so a logged-out token
/// is rejected even though its signature is intact. On success the resolved
/// user and the raw token are attached to the request extensions as an
/// [`AuthSession`]; on any failure the request short-circuits with a uniform
/// 401 and the handler never runs. Stored state is never mutated here.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public_route(req.method(), req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let token = match bearer_token(&req) {
                Some(token) => token,
                None => return Err(authentication_failed().into()),
            };

            let claims = match verify_token(&token) {
                Ok(claims) => claims,
                Err(_) => return Err(authentication_failed().into()),
            };

            let pool = match req.app_data::<web::Data<PgPool>>() {
                Some(pool) => pool.clone(),
                None => return Err(authentication_failed().into()),
            };

            // One query over both predicates: the decoded identity and the
            // session list must both match. A revoked token finds no row.
            let user = match store::sessions::user_for_session(&pool, claims.sub, &token).await {
                Ok(Some(user)) => user,
                // Store failures are indistinguishable from a bad token on
                // purpose.
                Ok(None) | Err(_) => return Err(authentication_failed().into()),
            };

            req.extensions_mut().insert(AuthSession { user, token });

            service.call(req).await
        })
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
}

fn authentication_failed() -> AppError {
    AppError::Unauthorized("Please authenticate.".into())
}

/// Routes reachable without a token: registration, login, the health check,
/// and avatar fetch (`GET /users/{id}/avatar`).
pub(crate) fn is_public_route(method: &Method, path: &str) -> bool {
    if method == Method::GET && path == "/health" {
        return true;
    }
    if method == Method::POST && (path == "/users" || path == "/users/login") {
        return true;
    }
    if method == Method::GET {
        if let Some(rest) = path.strip_prefix("/users/") {
            if let Some((id, tail)) = rest.split_once('/') {
                return !id.is_empty() && tail == "avatar";
            }
        }
    }
    false
}
