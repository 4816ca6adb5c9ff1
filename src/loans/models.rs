use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_positive_amount;

/// Loan status enum representing the lifecycle of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(LoanStatus::Pending),
            "approved" => Ok(LoanStatus::Approved),
            "rejected" => Ok(LoanStatus::Rejected),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Loan application as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: Uuid,
    /// Username of the applicant
    pub user_id: String,
    #[schema(value_type = String, example = "2500.00")]
    pub amount: Decimal,
    /// Term in months
    pub term: i32,
    pub purpose: String,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// A fresh pending application
    pub fn pending(user_id: &str, request: ApplyLoanRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            amount: request.amount,
            term: request.term,
            purpose: request.purpose,
            status: LoanStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ApplyLoanRequest {
    #[validate(custom = "validate_positive_amount")]
    #[schema(value_type = String, example = "2500.00")]
    pub amount: Decimal,
    #[validate(range(min = 1, max = 360))]
    pub term: i32,
    #[validate(length(min = 1, max = 500))]
    pub purpose: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplyLoanResponse {
    pub loan_id: Uuid,
    pub status: LoanStatus,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLoanStatusRequest {
    pub status: LoanStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoansResponse {
    pub loans: Vec<Loan>,
}

/// Raw query string for the admin loan listing
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoanListQuery {
    /// `pending`, `approved`, `rejected` or `all`
    pub status: Option<String>,
    /// `asc` or `desc` by creation time
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Parsed listing criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub order: SortOrder,
}

impl TryFrom<LoanListQuery> for LoanFilter {
    type Error = String;

    fn try_from(query: LoanListQuery) -> Result<Self, Self::Error> {
        let status = match query.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(raw.parse::<LoanStatus>()?),
        };

        let order = match query.order.as_deref().map(|o| o.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(other) => return Err(format!("Invalid sort order: {}", other)),
        };

        Ok(Self { status, order })
    }
}
