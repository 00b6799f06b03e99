use crate::{
    auth::{generate_token, hash_password, verify_password, AuthResponse, AuthSession, LoginRequest},
    avatar,
    error::AppError,
    models::user::{CreateUser, UpdateUser},
    store,
};
use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Register a new user
///
/// Creates the account and immediately opens a first session, returning the
/// public user view and the session token.
#[post("/users")]
pub async fn register(
    pool: web::Data<PgPool>,
    body: web::Json<CreateUser>,
) -> Result<impl Responder, AppError> {
    let mut input = body.into_inner();
    input.normalize();
    input.validate()?;

    if store::users::email_taken(&pool, &input.email, None).await? {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let password_hash = hash_password(&input.password)?;
    let user = store::users::insert(&pool, &input.name, &input.email, &password_hash, input.age)
        .await?;

    let token = generate_token(user.id)?;
    store::sessions::insert(&pool, user.id, &token).await?;

    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Login user
///
/// A missing account and a wrong password produce the identical response, so
/// the endpoint cannot be used to probe which emails are registered.
#[post("/users/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    body: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let mut credentials = body.into_inner();
    credentials.normalize();

    let user = store::users::find_by_email(&pool, &credentials.email)
        .await?
        .ok_or_else(login_rejected)?;

    if !verify_password(&credentials.password, &user.password)? {
        return Err(login_rejected());
    }

    let token = generate_token(user.id)?;
    store::sessions::insert(&pool, user.id, &token).await?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

fn login_rejected() -> AppError {
    AppError::BadRequest("Unable to login".into())
}

/// Logout the current session
///
/// Removes exactly the token this request authenticated with; the user's
/// other sessions stay valid.
#[post("/users/logout")]
pub async fn logout(
    pool: web::Data<PgPool>,
    session: AuthSession,
) -> Result<impl Responder, AppError> {
    store::sessions::remove(&pool, session.user.id, &session.token).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Logout every session (all devices)
#[post("/users/logoutAll")]
pub async fn logout_all(
    pool: web::Data<PgPool>,
    session: AuthSession,
) -> Result<impl Responder, AppError> {
    store::sessions::clear(&pool, session.user.id).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Read own profile
#[get("/users/me")]
pub async fn me(session: AuthSession) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(session.user))
}

/// Update own profile
///
/// Accepts only {name, email, password, age}; a body containing anything
/// else is rejected as a whole before any field is applied.
#[patch("/users/me")]
pub async fn update_me(
    pool: web::Data<PgPool>,
    session: AuthSession,
    body: web::Json<UpdateUser>,
) -> Result<impl Responder, AppError> {
    let mut updates = body.into_inner();
    updates.normalize();
    updates.validate()?;

    let mut user = session.user;

    if let Some(name) = updates.name {
        user.name = name;
    }
    if let Some(email) = updates.email {
        if store::users::email_taken(&pool, &email, Some(user.id)).await? {
            return Err(AppError::BadRequest("Email already registered".into()));
        }
        user.email = email;
    }
    if let Some(password) = updates.password {
        user.password = hash_password(&password)?;
    }
    if let Some(age) = updates.age {
        user.age = age;
    }

    let user = store::users::update(&pool, &user).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Delete own account
///
/// Owned tasks are removed first, then the user row; the two statements run
/// outside a transaction, so a crash in between can leave orphaned tasks.
/// Session rows disappear with the user. Responds with the deleted user's
/// public view.
#[delete("/users/me")]
pub async fn delete_me(
    pool: web::Data<PgPool>,
    session: AuthSession,
) -> Result<impl Responder, AppError> {
    store::tasks::delete_all_for_owner(&pool, session.user.id).await?;
    store::users::delete(&pool, session.user.id).await?;
    Ok(HttpResponse::Ok().json(session.user))
}

/// Upload an avatar
///
/// Single multipart file field `avatar`, at most 1 MB, filename extension
/// jpg/jpeg/png. The image is re-encoded to a 250×250 PNG before storage.
#[post("/users/me/avatar")]
pub async fn upload_avatar(
    pool: web::Data<PgPool>,
    session: AuthSession,
    mut payload: Multipart,
) -> Result<impl Responder, AppError> {
    let upload = avatar::read_upload(&mut payload).await?;
    let png = avatar::to_png_avatar(&upload)?;

    store::users::set_avatar(&pool, session.user.id, &png).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Delete own avatar
#[delete("/users/me/avatar")]
pub async fn delete_avatar(
    pool: web::Data<PgPool>,
    session: AuthSession,
) -> Result<impl Responder, AppError> {
    store::users::clear_avatar(&pool, session.user.id).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Fetch a user's avatar (public)
///
/// Responds 404 both when the user does not exist and when no avatar is
/// stored.
#[get("/users/{id}/avatar")]
pub async fn get_avatar(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let png = store::users::avatar(&pool, user_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Avatar not found".into()))?;

    Ok(HttpResponse::Ok().content_type("image/png").body(png))
}
