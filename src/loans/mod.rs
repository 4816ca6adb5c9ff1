// Loan desk: applications, admin review and removal

pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod status_machine;

pub use error::LoanError;
pub use models::{Loan, LoanFilter, LoanStatus};
pub use repository::{LoanRepository, LoanStore};
pub use service::LoanService;
pub use status_machine::StatusMachine;
