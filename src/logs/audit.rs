// Audit Logger
//
// Writes system log records for sensitive actions.
// Gracefully handles failures to avoid blocking primary operations.

use std::sync::Arc;
use std::time::Duration;

use crate::deadline::bounded;
use crate::logs::{
    models::{AuditAction, SystemLog},
    repository::{AuditSink, LogError},
};

/// Audit Logger
///
/// Failures and timeouts are logged through `tracing` but never propagate.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
    timeout: Duration,
}

impl AuditLogger {
    /// Create a new AuditLogger
    pub fn new(sink: Arc<dyn AuditSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    /// Record an action performed by `actor` (empty for anonymous actions)
    pub async fn record(&self, actor: &str, action: AuditAction, details: impl Into<String>) {
        let entry = SystemLog::new(actor, action, details);

        let result: Result<(), LogError> =
            bounded("audit.record", self.timeout, self.sink.record(&entry)).await;

        if let Err(e) = result {
            // Audit failures shouldn't block operations
            tracing::error!("Failed to write audit record '{}' for '{}': {}", action, actor, e);
        }
    }

    /// All audit records, newest first
    pub async fn list(&self) -> Result<Vec<SystemLog>, LogError> {
        bounded("audit.list", self.timeout, self.sink.list()).await
    }
}
