use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A user record as stored in the database.
///
/// The password hash is never serialized; sessions and the avatar blob live
/// in their own storage and are not part of this struct, so serializing a
/// `User` always produces the public view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload. Fields outside this set are ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom = "crate::auth::password::password_policy"
    )]
    pub password: String,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    #[serde(default)]
    pub age: i32,
}

impl CreateUser {
    /// Trims whitespace and lower-cases the email before validation.
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.password = self.password.trim().to_string();
    }
}

/// Profile update payload. Any field outside the {name, email, password, age}
/// whitelist fails deserialization, rejecting the whole request.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom = "crate::auth::password::password_policy"
    )]
    pub password: Option<String>,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
}

impl UpdateUser {
    pub fn normalize(&mut self) {
        if let Some(name) = &mut self.name {
            *name = name.trim().to_string();
        }
        if let Some(email) = &mut self.email {
            *email = email.trim().to_lowercase();
        }
        if let Some(password) = &mut self.password {
            *password = password.trim().to_string();
        }
    }
}
