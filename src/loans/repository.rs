use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::loans::{
    error::LoanError,
    models::{Loan, LoanFilter, LoanStatus, SortOrder},
};

const LOAN_COLUMNS: &str = "id, user_id, amount, term, purpose, status, created_at, updated_at";

/// Persistence operations the loan desk needs
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn insert(&self, loan: &Loan) -> Result<Loan, LoanError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Loan>, LoanError>;

    async fn list(&self, filter: &LoanFilter) -> Result<Vec<Loan>, LoanError>;

    /// Set the status only while the stored loan is still pending or already
    /// holds `status`. Returns `None` when the loan is missing or the write
    /// was refused.
    async fn update_status(&self, id: Uuid, status: LoanStatus) -> Result<Option<Loan>, LoanError>;

    /// Returns false if nothing was deleted
    async fn delete(&self, id: Uuid) -> Result<bool, LoanError>;
}

/// Repository for loan operations
#[derive(Clone)]
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    /// Create a new LoanRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for LoanRepository {
    async fn insert(&self, loan: &Loan) -> Result<Loan, LoanError> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO loans (id, user_id, amount, term, purpose, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(loan.id)
        .bind(&loan.user_id)
        .bind(loan.amount)
        .bind(loan.term)
        .bind(&loan.purpose)
        .bind(loan.status)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(loan)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Loan>, LoanError> {
        let loan = sqlx::query_as::<_, Loan>(&format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(loan)
    }

    async fn list(&self, filter: &LoanFilter) -> Result<Vec<Loan>, LoanError> {
        let direction = match filter.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let loans = match filter.status {
            Some(status) => {
                sqlx::query_as::<_, Loan>(&format!(
                    "SELECT {} FROM loans WHERE status = $1 ORDER BY created_at {}",
                    LOAN_COLUMNS, direction
                ))
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Loan>(&format!(
                    "SELECT {} FROM loans ORDER BY created_at {}",
                    LOAN_COLUMNS, direction
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(loans)
    }

    async fn update_status(&self, id: Uuid, status: LoanStatus) -> Result<Option<Loan>, LoanError> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans SET status = $1, updated_at = NOW()
            WHERE id = $2 AND (status = 'pending' OR status = $1)
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, LoanError> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
