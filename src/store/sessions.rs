//! The session list: one row per active token, owned by its user.
//!
//! The original design kept tokens embedded in the user record; here they
//! are an explicit collection with membership-check and removal operations,
//! which is what logout and revocation actually need.

use sqlx::PgPool;

use crate::models::user::User;

pub async fn insert(pool: &PgPool, user_id: i32, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO sessions (user_id, token) VALUES ($1, $2)")
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Removes exactly one token from the user's session list. Other concurrent
/// sessions of the same user stay valid.
pub async fn remove(pool: &PgPool, user_id: i32, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token = $2")
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Revokes every session the user holds (logout-all).
pub async fn clear(pool: &PgPool, user_id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// The membership check behind the auth guard: resolves a user only when the
/// id matches *and* the session list still contains this exact token, in a
/// single query.
pub async fn user_for_session(
    pool: &PgPool,
    user_id: i32,
    token: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT u.id, u.name, u.email, u.password, u.age, u.created_at, u.updated_at \
         FROM users u \
         INNER JOIN sessions s ON s.user_id = u.id \
         WHERE u.id = $1 AND s.token = $2",
    )
    .bind(user_id)
    .bind(token)
    .fetch_optional(pool)
    .await
}
