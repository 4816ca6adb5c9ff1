use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::deadline::bounded;
use crate::loans::{
    error::LoanError,
    models::{ApplyLoanRequest, ApplyLoanResponse, Loan, LoanFilter, LoanStatus},
    repository::LoanStore,
    status_machine::StatusMachine,
};
use crate::logs::{audit::AuditLogger, models::AuditAction};

/// Service for loan applications and their review
pub struct LoanService {
    loans: Arc<dyn LoanStore>,
    audit: AuditLogger,
    timeout: Duration,
}

impl LoanService {
    pub fn new(loans: Arc<dyn LoanStore>, audit: AuditLogger, timeout: Duration) -> Self {
        Self { loans, audit, timeout }
    }

    /// Submit a new application; it starts out pending
    pub async fn apply_loan(&self, username: &str, request: ApplyLoanRequest) -> Result<ApplyLoanResponse, LoanError> {
        request
            .validate()
            .map_err(|e| LoanError::ValidationError(e.to_string()))?;

        let loan = Loan::pending(username, request);
        let loan = bounded("loans.insert", self.timeout, self.loans.insert(&loan)).await?;

        tracing::info!("Loan {} submitted by '{}' for {}", loan.id, username, loan.amount);
        self.audit
            .record(
                username,
                AuditAction::LoanApplied,
                format!("Applied for {} over {} months", loan.amount, loan.term),
            )
            .await;

        Ok(ApplyLoanResponse {
            loan_id: loan.id,
            status: loan.status,
            message: "Loan application submitted successfully".to_string(),
        })
    }

    /// Fetch one loan; only admins may read loans they do not own
    pub async fn get_loan(&self, id: Uuid, requester: &AuthenticatedUser) -> Result<Loan, LoanError> {
        let loan = self.find(id).await?;

        if !requester.is_admin() && loan.user_id != requester.username {
            tracing::warn!("'{}' attempted to read loan {} owned by someone else", requester.username, id);
            return Err(LoanError::Forbidden("You can only view your own loans".to_string()));
        }

        self.audit
            .record(
                &requester.username,
                AuditAction::LoanRetrieved,
                format!("Loan {} status {}", id, loan.status),
            )
            .await;
        Ok(loan)
    }

    pub async fn list_loans(&self, filter: LoanFilter, actor: &str) -> Result<Vec<Loan>, LoanError> {
        let loans = bounded("loans.list", self.timeout, self.loans.list(&filter)).await?;

        let scope = filter.status.map_or("all", |s| s.as_str());
        self.audit
            .record(
                actor,
                AuditAction::LoansListed,
                format!("Retrieved {} {} loans", loans.len(), scope),
            )
            .await;
        Ok(loans)
    }

    /// Move a loan to `approved` or `rejected`
    pub async fn update_status(&self, id: Uuid, target: LoanStatus, actor: &str) -> Result<Loan, LoanError> {
        if target == LoanStatus::Pending {
            return Err(LoanError::ValidationError(
                "Status must be 'approved' or 'rejected'".to_string(),
            ));
        }

        let loan = self.find(id).await?;
        let next = StatusMachine::transition(loan.status, target).map_err(LoanError::InvalidTransition)?;

        let updated = match bounded("loans.update_status", self.timeout, self.loans.update_status(id, next)).await? {
            Some(updated) => updated,
            // Someone else decided the loan between our read and the write
            None => {
                let current = self.find(id).await?;
                tracing::warn!("Loan {} moved to {} concurrently, refusing {}", id, current.status, next);
                return Err(LoanError::InvalidTransition(format!(
                    "Invalid status transition from {} to {}",
                    current.status, next
                )));
            }
        };

        tracing::info!("Loan {} moved from {} to {} by '{}'", id, loan.status, next, actor);
        self.audit
            .record(
                actor,
                AuditAction::LoanStatusUpdated,
                format!("Loan {} status {} -> {}", id, loan.status, next),
            )
            .await;
        Ok(updated)
    }

    pub async fn delete_loan(&self, id: Uuid, actor: &str) -> Result<(), LoanError> {
        let deleted = bounded("loans.delete", self.timeout, self.loans.delete(id)).await?;
        if !deleted {
            return Err(LoanError::NotFound(id));
        }

        tracing::info!("Loan {} deleted by '{}'", id, actor);
        self.audit
            .record(actor, AuditAction::LoanDeleted, format!("Deleted loan {}", id))
            .await;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Loan, LoanError> {
        bounded("loans.find_by_id", self.timeout, self.loans.find_by_id(id))
            .await?
            .ok_or(LoanError::NotFound(id))
    }
}
