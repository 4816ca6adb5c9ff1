// HTTP handler for the audit log viewer

use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::logs::models::LogsResponse;
use crate::AppState;

/// All system log records, newest first (admin only)
#[utoipa::path(
    get,
    path = "/admin/logs",
    tag = "admin",
    responses(
        (status = 200, description = "Audit records, newest first", body = LogsResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_logs_handler(State(state): State<AppState>) -> Result<Json<LogsResponse>, ApiError> {
    let logs = state.audit.list().await?;
    Ok(Json(LogsResponse { logs }))
}
