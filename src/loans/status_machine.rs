use crate::loans::models::LoanStatus;

/// Service for managing loan status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Approved, Rejected
    /// - Approved, Rejected → (terminal)
    /// - Any status → Same status (idempotent)
    pub fn is_valid_transition(from: LoanStatus, to: LoanStatus) -> bool {
        // Same status is always valid (idempotent)
        if from == to {
            return true;
        }

        matches!(
            (from, to),
            (LoanStatus::Pending, LoanStatus::Approved) | (LoanStatus::Pending, LoanStatus::Rejected)
        )
    }

    /// Attempt to transition from one status to another
    ///
    /// Returns `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: LoanStatus, to: LoanStatus) -> Result<LoanStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }
}
