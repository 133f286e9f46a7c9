use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::DbError;
use shared_models::error::AppError;
use shared_utils::jwt::TokenError;

use crate::services::firebase::IdentityError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Option<String>,
}

/// OAuth2 password-grant form. The email travels in `username`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileResponse {
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already exists.")]
    EmailExists,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Account is disabled.")]
    AccountDisabled,

    #[error("User not found")]
    ProfileNotFound,

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::Validation(_) => AppError::ValidationError(message),
            AuthError::EmailExists => AppError::BadRequest(message),
            AuthError::InvalidCredentials | AuthError::AccountDisabled => AppError::Auth(message),
            AuthError::ProfileNotFound => AppError::NotFound(message),
            AuthError::Identity(_) | AuthError::Token(_) => AppError::Internal(message),
            AuthError::Database(_) => AppError::Database(message),
        }
    }
}
