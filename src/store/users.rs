use sqlx::PgPool;

use crate::models::user::User;

const USER_COLUMNS: &str = "id, name, email, password, age, created_at, updated_at";

pub async fn insert(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    age: i32,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, password, age) VALUES ($1, $2, $3, $4) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(age)
    .fetch_one(pool)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Whether an email is already registered, optionally ignoring one user
/// (the caller itself, when re-validating a profile update).
pub async fn email_taken(
    pool: &PgPool,
    email: &str,
    exclude: Option<i32>,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1 AND ($2::int IS NULL OR id <> $2)")
            .bind(email)
            .bind(exclude)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

pub async fn update(pool: &PgPool, user: &User) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET name = $1, email = $2, password = $3, age = $4, updated_at = now() \
         WHERE id = $5 RETURNING {USER_COLUMNS}"
    ))
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password)
    .bind(user.age)
    .bind(user.id)
    .fetch_one(pool)
    .await
}

/// Deletes the user row. Sessions go with it via the schema; owned tasks are
/// the caller's responsibility and must be removed first.
pub async fn delete(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_avatar(pool: &PgPool, id: i32, png: &[u8]) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET avatar = $1, updated_at = now() WHERE id = $2")
        .bind(png)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn clear_avatar(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET avatar = NULL, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// The stored avatar bytes, or `None` when the user does not exist or has no
/// avatar. The two cases are indistinguishable on purpose.
pub async fn avatar(pool: &PgPool, id: i32) -> Result<Option<Vec<u8>>, sqlx::Error> {
    let row: Option<(Option<Vec<u8>>,)> = sqlx::query_as("SELECT avatar FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|(avatar,)| avatar))
}
