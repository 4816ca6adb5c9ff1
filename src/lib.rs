pub mod auth;
pub mod config;
pub mod db;
pub mod deadline;
pub mod error;
pub mod loans;
pub mod logs;
pub mod notifications;
pub mod validation;

#[cfg(test)]
mod test_support;

use axum::{
    extract::FromRef,
    middleware,
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    handlers::{
        change_password_handler, delete_me_handler, delete_user_handler, forgot_password_handler, list_users_handler,
        login_handler, profile_handler, refresh_handler, register_handler, reset_password_handler,
        verify_email_handler,
    },
    require_admin, AuthService, TokenService, UserRepository,
};
use config::AppConfig;
use loans::{
    handlers::{
        apply_loan_handler, delete_loan_handler, get_loan_handler, list_loans_handler, update_loan_status_handler,
    },
    LoanRepository, LoanService,
};
use logs::{list_logs_handler, AuditLogger, SystemLogRepository};
use notifications::{LogNotifier, NotificationError, NotificationSender, WebhookNotifier};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        auth::handlers::register_handler,
        auth::handlers::verify_email_handler,
        auth::handlers::login_handler,
        auth::handlers::refresh_handler,
        auth::handlers::profile_handler,
        auth::handlers::forgot_password_handler,
        auth::handlers::reset_password_handler,
        auth::handlers::change_password_handler,
        auth::handlers::delete_me_handler,
        auth::handlers::list_users_handler,
        auth::handlers::delete_user_handler,
        logs::handlers::list_logs_handler,
        loans::handlers::apply_loan_handler,
        loans::handlers::get_loan_handler,
        loans::handlers::list_loans_handler,
        loans::handlers::update_loan_status_handler,
        loans::handlers::delete_loan_handler,
    ),
    components(
        schemas(
            auth::models::Role,
            auth::models::UserResponse,
            auth::models::RegisterRequest,
            auth::models::LoginRequest,
            auth::models::ForgotPasswordRequest,
            auth::models::ChangePasswordRequest,
            auth::models::AccessTokenResponse,
            auth::models::MessageResponse,
            auth::models::RegisterResponse,
            auth::models::ProfileResponse,
            auth::models::UsersResponse,
            logs::models::SystemLog,
            logs::models::LogsResponse,
            loans::models::Loan,
            loans::models::LoanStatus,
            loans::models::ApplyLoanRequest,
            loans::models::ApplyLoanResponse,
            loans::models::UpdateLoanStatusRequest,
            loans::models::LoansResponse,
        )
    ),
    tags(
        (name = "users", description = "Registration, verification, login and account management"),
        (name = "loans", description = "Loan applications"),
        (name = "admin", description = "Admin-only user, loan and audit log management"),
        (name = "health", description = "Liveness probe")
    ),
    info(
        title = "Loan Tracker API",
        version = "1.0.0",
        description = "Loan application tracking with JWT authentication and audit logging"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub token_service: Arc<TokenService>,
    pub loan_service: Arc<LoanService>,
    pub audit: AuditLogger,
    /// Whether the refresh cookie carries the `Secure` attribute
    pub cookie_secure: bool,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.token_service.clone()
    }
}

impl AppState {
    /// Wire Postgres-backed stores and the configured mail transport
    pub fn from_config(config: &AppConfig, pool: PgPool) -> Result<Self, NotificationError> {
        let timeout = config.dependency_timeout;

        let notifier: Arc<dyn NotificationSender> = match &config.notify_webhook_url {
            Some(url) => {
                tracing::info!("Sending email through mail relay at {}", url);
                Arc::new(WebhookNotifier::new(url.clone(), timeout)?)
            }
            None => {
                tracing::warn!("NOTIFY_WEBHOOK_URL not set, verification and reset links will only be logged");
                Arc::new(LogNotifier)
            }
        };

        let audit = AuditLogger::new(Arc::new(SystemLogRepository::new(pool.clone())), timeout);
        let token_service = Arc::new(TokenService::new(&config.jwt_secret));

        let auth_service = Arc::new(AuthService::new(
            Arc::new(UserRepository::new(pool.clone())),
            notifier,
            audit.clone(),
            token_service.clone(),
            config.public_base_url.clone(),
            timeout,
        ));
        let loan_service = Arc::new(LoanService::new(Arc::new(LoanRepository::new(pool)), audit.clone(), timeout));

        Ok(Self {
            auth_service,
            token_service,
            loan_service,
            audit,
            cookie_secure: config.cookie_secure,
        })
    }
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up"))
)]
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the application router
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route("/admin/users", get(list_users_handler))
        .route("/admin/users/:id", delete(delete_user_handler))
        .route("/admin/logs", get(list_logs_handler))
        .route("/admin/loans", get(list_loans_handler))
        .route("/admin/loans/:id", delete(delete_loan_handler))
        .route("/admin/loans/:id/status", patch(update_loan_status_handler))
        .route_layer(middleware::from_fn_with_state(state.token_service.clone(), require_admin));

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        // Public user routes
        .route("/users/register", post(register_handler))
        .route("/users/verify-email/:token", get(verify_email_handler))
        .route("/users/login", post(login_handler))
        .route("/users/refresh-token", post(refresh_handler))
        .route("/users/password-reset", post(forgot_password_handler))
        .route("/users/reset-password/:token", get(reset_password_handler))
        // Authenticated user routes
        .route("/users/profile", get(profile_handler))
        .route("/users/password-update", post(change_password_handler))
        .route("/users/me", delete(delete_me_handler))
        .route("/loans", post(apply_loan_handler))
        .route("/loans/:id", get(get_loan_handler))
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}
