use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::deadline::DeadlineExceeded;
use crate::error::ApiError;

/// Error types for loan operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoanError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Loan with id {0} not found")]
    NotFound(Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0}")]
    Timeout(#[from] DeadlineExceeded),
}

impl From<sqlx::Error> for LoanError {
    fn from(err: sqlx::Error) -> Self {
        LoanError::DatabaseError(err.to_string())
    }
}

impl From<LoanError> for ApiError {
    fn from(err: LoanError) -> Self {
        match err {
            LoanError::DatabaseError(msg) => ApiError::DatabaseError(msg),
            LoanError::NotFound(id) => ApiError::NotFound {
                resource: "Loan".to_string(),
                id: id.to_string(),
            },
            LoanError::Forbidden(msg) => ApiError::Forbidden(msg),
            LoanError::InvalidTransition(msg) => ApiError::BadRequest(msg),
            LoanError::ValidationError(msg) => ApiError::BadRequest(msg),
            LoanError::Timeout(elapsed) => ApiError::InternalError(elapsed.to_string()),
        }
    }
}

impl IntoResponse for LoanError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
