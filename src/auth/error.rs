// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::{debug, error, warn};

use crate::auth::models::Role;
use crate::deadline::DeadlineExceeded;

/// Authentication and authorization error types
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    // Input errors
    ValidationError(String),
    DuplicateEmail,
    DuplicateUsername,

    // Authentication errors
    InvalidCredentials,
    AccountNotVerified,
    /// Plaintext did not match the stored hash
    PasswordMismatch,
    InvalidToken,
    ExpiredToken,
    MalformedToken,
    MissingToken,
    /// A verification or reset link carried an unusable token
    InvalidLink(String),
    UserNotFound,

    // Authorization errors
    /// User lacks required permissions for the operation
    /// Contains the required role and the user's actual role
    InsufficientPermissions {
        required: Role,
        actual: Role,
    },

    // Dependency errors
    PasswordHashError,
    TokenGenerationError(String),
    NotificationError(String),
    DatabaseError(String),
    DeletionError(String),
    DependencyTimeout(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AuthError::DuplicateEmail => write!(f, "email already registered"),
            AuthError::DuplicateUsername => write!(f, "username already registered"),
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::AccountNotVerified => write!(f, "user not verified"),
            AuthError::PasswordMismatch => write!(f, "Password does not match"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token has expired"),
            AuthError::MalformedToken => write!(f, "Malformed token"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::InvalidLink(reason) => write!(f, "Invalid or expired link: {}", reason),
            AuthError::UserNotFound => write!(f, "user not found"),
            AuthError::InsufficientPermissions { required, actual } => {
                write!(f, "Insufficient permissions: required role '{}', but user has role '{}'", required, actual)
            }
            AuthError::PasswordHashError => write!(f, "Password hashing error"),
            AuthError::TokenGenerationError(msg) => write!(f, "Token generation error: {}", msg),
            AuthError::NotificationError(msg) => write!(f, "Notification error: {}", msg),
            AuthError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AuthError::DeletionError(msg) => write!(f, "Deletion error: {}", msg),
            AuthError::DependencyTimeout(msg) => write!(f, "Dependency timeout: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::ValidationError(msg) => debug!("Auth validation error: {}", msg),
            AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::MalformedToken => {
                warn!("Rejected token: {}", self)
            }
            AuthError::MissingToken => warn!("Missing token in request"),
            AuthError::InsufficientPermissions { required, actual } => {
                warn!("Authorization failed: required role '{}', user has role '{}'", required, actual)
            }
            AuthError::PasswordHashError
            | AuthError::TokenGenerationError(_)
            | AuthError::NotificationError(_)
            | AuthError::DatabaseError(_)
            | AuthError::DeletionError(_)
            | AuthError::DependencyTimeout(_) => error!("Auth dependency failure: {}", self),
            _ => debug!("Auth request rejected: {}", self),
        }

        let body = Json(json!({
            "error": self.error_message(),
        }));

        (self.status_code(), body).into_response()
    }
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AuthError::DuplicateUsername => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AuthError::AccountNotVerified => StatusCode::BAD_REQUEST,
            AuthError::PasswordMismatch => StatusCode::BAD_REQUEST,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::MalformedToken => StatusCode::UNAUTHORIZED,
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidLink(_) => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::BAD_REQUEST,
            AuthError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            AuthError::PasswordHashError => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::NotificationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::DeletionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::DependencyTimeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a descriptive error message for this error
    /// This message is safe to send to clients (no sensitive data)
    pub fn error_message(&self) -> String {
        match self {
            AuthError::ValidationError(msg) => msg.clone(),
            AuthError::PasswordMismatch => AuthError::InvalidCredentials.to_string(),
            AuthError::InsufficientPermissions { required, .. } => {
                format!("Insufficient permissions: required role '{}'", required)
            }
            AuthError::NotificationError(_) => "failed to send email".to_string(),
            AuthError::PasswordHashError
            | AuthError::TokenGenerationError(_)
            | AuthError::DatabaseError(_)
            | AuthError::DeletionError(_)
            | AuthError::DependencyTimeout(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Token failures on emailed links are reported as bad requests
    pub fn into_link_error(self) -> Self {
        match self {
            AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::MalformedToken => {
                AuthError::InvalidLink(self.to_string())
            }
            other => other,
        }
    }

    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::MalformedToken | AuthError::MissingToken
        )
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::DatabaseError(err.to_string())
    }
}

impl From<DeadlineExceeded> for AuthError {
    fn from(err: DeadlineExceeded) -> Self {
        AuthError::DependencyTimeout(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AuthError::ValidationError(format!("Invalid input: {}", errors))
    }
}
