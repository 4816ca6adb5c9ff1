// Audit sink backed by the system_logs table

use async_trait::async_trait;
use sqlx::PgPool;

use crate::deadline::DeadlineExceeded;
use crate::error::ApiError;
use crate::logs::models::SystemLog;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("{0}")]
    Timeout(#[from] DeadlineExceeded),
}

impl From<sqlx::Error> for LogError {
    fn from(err: sqlx::Error) -> Self {
        LogError::DatabaseError(err.to_string())
    }
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::DatabaseError(msg) => ApiError::DatabaseError(msg),
            LogError::Timeout(elapsed) => ApiError::InternalError(elapsed.to_string()),
        }
    }
}

/// Append-only destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &SystemLog) -> Result<(), LogError>;

    /// All records, newest first
    async fn list(&self) -> Result<Vec<SystemLog>, LogError>;
}

#[derive(Clone)]
pub struct SystemLogRepository {
    pool: PgPool,
}

impl SystemLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for SystemLogRepository {
    async fn record(&self, entry: &SystemLog) -> Result<(), LogError> {
        sqlx::query(
            r#"
            INSERT INTO system_logs (id, timestamp, user_id, action, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(entry.timestamp)
        .bind(&entry.user_id)
        .bind(&entry.action)
        .bind(&entry.details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<SystemLog>, LogError> {
        let logs = sqlx::query_as::<_, SystemLog>(
            "SELECT id, timestamp, user_id, action, details FROM system_logs ORDER BY timestamp DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
