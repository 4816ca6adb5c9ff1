// HTTP handlers for loan endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::ApiError;
use crate::loans::models::{
    ApplyLoanRequest, ApplyLoanResponse, Loan, LoanFilter, LoanListQuery, LoansResponse, UpdateLoanStatusRequest,
};
use crate::AppState;

/// Handler for POST /loans
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = ApplyLoanRequest,
    responses(
        (status = 201, description = "Application submitted", body = ApplyLoanResponse),
        (status = 400, description = "Invalid application"),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn apply_loan_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ApplyLoanRequest>,
) -> Result<(StatusCode, Json<ApplyLoanResponse>), ApiError> {
    let response = state.loan_service.apply_loan(&user.username, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for GET /loans/{id}
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan found", body = Loan),
        (status = 403, description = "Loan belongs to another user"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Loan>, ApiError> {
    let loan = state.loan_service.get_loan(id, &user).await?;
    Ok(Json(loan))
}

/// Handler for GET /admin/loans
#[utoipa::path(
    get,
    path = "/admin/loans",
    tag = "admin",
    params(LoanListQuery),
    responses(
        (status = 200, description = "Loans matching the filter", body = LoansResponse),
        (status = 400, description = "Unknown status or order"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_loans_handler(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Query(query): Query<LoanListQuery>,
) -> Result<Json<LoansResponse>, ApiError> {
    let filter = LoanFilter::try_from(query).map_err(ApiError::BadRequest)?;
    let loans = state.loan_service.list_loans(filter, &admin.username).await?;
    Ok(Json(LoansResponse { loans }))
}

/// Handler for PATCH /admin/loans/{id}/status
#[utoipa::path(
    patch,
    path = "/admin/loans/{id}/status",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Loan ID")),
    request_body = UpdateLoanStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Loan),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn update_loan_status_handler(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLoanStatusRequest>,
) -> Result<Json<Loan>, ApiError> {
    let loan = state
        .loan_service
        .update_status(id, request.status, &admin.username)
        .await?;
    Ok(Json(loan))
}

/// Handler for DELETE /admin/loans/{id}
#[utoipa::path(
    delete,
    path = "/admin/loans/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan_handler(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.loan_service.delete_loan(id, &admin.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
