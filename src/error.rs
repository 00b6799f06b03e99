//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the
//! application. It centralizes error management, providing a consistent way to
//! represent the error conditions that can occur, from database failures to
//! rejected input.
//!
//! `AppError` implements `actix_web::error::ResponseError` so that handler
//! failures convert into HTTP responses: client-facing errors (400/401) carry
//! a JSON `{"error": ...}` body, while not-found and server-side failures
//! respond with an empty body. `From` implementations for `sqlx::Error`,
//! `validator::ValidationErrors`, `jsonwebtoken::errors::Error`,
//! `bcrypt::BcryptError`, `actix_multipart::MultipartError`, and
//! `image::ImageError` allow handlers to use the `?` operator.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failed or is required but missing (HTTP 401).
    /// Always carries the same generic message so that the cause is not
    /// distinguishable from the outside.
    Unauthorized(String),
    /// A malformed or out-of-policy request (HTTP 400).
    BadRequest(String),
    /// The requested resource does not exist, or belongs to another owner
    /// (HTTP 404 with an empty body in either case).
    NotFound(String),
    /// An unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// An error originating from store operations (HTTP 500).
    DatabaseError(String),
    /// Failed input validation (HTTP 400), carrying the field-level detail.
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::BadRequest(msg) | AppError::ValidationError(msg) => {
                HttpResponse::BadRequest().json(json!({
                    "error": msg
                }))
            }
            // Ownership failures are reported exactly like missing resources,
            // with nothing in the body to leak existence.
            AppError::NotFound(_) => HttpResponse::NotFound().finish(),
            AppError::InternalServerError(msg) | AppError::DatabaseError(msg) => {
                log::error!("request failed: {}", msg);
                HttpResponse::InternalServerError().finish()
            }
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `sqlx::Error::RowNotFound` maps to `AppError::NotFound`; everything else
/// becomes `AppError::DatabaseError`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// Upload parsing failures surface as structured 400s.
impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> AppError {
        AppError::BadRequest(error.to_string())
    }
}

/// Image decode/re-encode failures surface as structured 400s.
impl From<image::ImageError> for AppError {
    fn from(error: image::ImageError) -> AppError {
        AppError::BadRequest(error.to_string())
    }
}
