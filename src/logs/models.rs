use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Audit record stored in the system log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SystemLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Acting user; empty for anonymous or system actions
    pub user_id: String,
    #[schema(example = "User Registered")]
    pub action: String,
    pub details: String,
}

impl SystemLog {
    pub fn new(user_id: impl Into<String>, action: AuditAction, details: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id: user_id.into(),
            action: action.as_str().to_string(),
            details: details.into(),
        }
    }
}

/// Action tags written to the system log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserRegistered,
    UserVerified,
    UserLoggedIn,
    PasswordResetRequested,
    PasswordChanged,
    PasswordChangeFailed,
    UserDeleted,
    LoanApplied,
    LoanRetrieved,
    LoansListed,
    LoanStatusUpdated,
    LoanDeleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegistered => "User Registered",
            AuditAction::UserVerified => "User Verified",
            AuditAction::UserLoggedIn => "User Logged In",
            AuditAction::PasswordResetRequested => "Password Reset Requested",
            AuditAction::PasswordChanged => "Password Changed",
            AuditAction::PasswordChangeFailed => "Password Change Failed",
            AuditAction::UserDeleted => "User Deleted",
            AuditAction::LoanApplied => "Loan Application Submission",
            AuditAction::LoanRetrieved => "Loan Status Retrieved",
            AuditAction::LoansListed => "All Loans Retrieved",
            AuditAction::LoanStatusUpdated => "Loan Status Updated",
            AuditAction::LoanDeleted => "Loan Deleted",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogsResponse {
    pub logs: Vec<SystemLog>,
}
