// Audit log: append-only system records of sensitive actions

pub mod audit;
pub mod handlers;
pub mod models;
pub mod repository;

pub use audit::AuditLogger;
pub use handlers::list_logs_handler;
pub use models::{AuditAction, LogsResponse, SystemLog};
pub use repository::{AuditSink, LogError, SystemLogRepository};
