// HTTP handlers for authentication endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    error::AuthError,
    middleware::AuthenticatedUser,
    models::{
        AccessTokenResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, MessageResponse,
        ProfileResponse, RegisterRequest, RegisterResponse, UsersResponse,
    },
    service::TokenPair,
    token::REFRESH_TOKEN_TTL_SECS,
};
use crate::AppState;

pub const REFRESH_COOKIE: &str = "refresh_token";

/// Refresh cookie; its lifetime follows the refresh token's
fn refresh_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(REFRESH_TOKEN_TTL_SECS))
        .build()
}

/// Put the refresh token in the cookie jar and the access token in the body
fn session_response(
    jar: CookieJar,
    pair: TokenPair,
    secure: bool,
) -> (CookieJar, Json<AccessTokenResponse>) {
    let jar = jar.add(refresh_cookie(pair.refresh_token, secure));
    (
        jar,
        Json(AccessTokenResponse {
            access_token: pair.access_token,
        }),
    )
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/users/register",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, verification email sent", body = RegisterResponse),
        (status = 400, description = "Validation failure or duplicate email/username")
    )
)]
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    request.validate()?;

    let user = state.auth_service.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully. Please check your email to verify your account".to_string(),
            user,
        }),
    ))
}

/// Activate an account from its emailed link
#[utoipa::path(
    get,
    path = "/users/verify-email/{token}",
    tag = "users",
    params(("token" = String, Path, description = "Token from the verification email")),
    responses(
        (status = 200, description = "Account verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired link")
    )
)]
pub async fn verify_email_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, AuthError> {
    state
        .auth_service
        .verify_email(&token)
        .await
        .map_err(AuthError::into_link_error)?;

    Ok(Json(MessageResponse::new("User verified successfully")))
}

/// Login with username and password
#[utoipa::path(
    post,
    path = "/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token in body, refresh token in cookie", body = AccessTokenResponse),
        (status = 400, description = "Invalid credentials or unverified account")
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AccessTokenResponse>), AuthError> {
    request.validate()?;

    let pair = state
        .auth_service
        .login(&request.username, &request.password)
        .await?;

    Ok(session_response(jar, pair, state.cookie_secure))
}

/// Mint a new access token from the refresh cookie
#[utoipa::path(
    post,
    path = "/users/refresh-token",
    tag = "users",
    responses(
        (status = 200, description = "New access token, rotated refresh cookie", body = AccessTokenResponse),
        (status = 401, description = "Missing, invalid or expired refresh token")
    )
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AccessTokenResponse>), AuthError> {
    let refresh_token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let pair = state.auth_service.refresh_tokens(&refresh_token).await?;

    Ok(session_response(jar, pair, state.cookie_secure))
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/users/profile",
    tag = "users",
    responses(
        (status = 200, description = "Profile of the caller", body = ProfileResponse),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn profile_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ProfileResponse>, AuthError> {
    let user = state.auth_service.get_profile(&user.username).await?;
    Ok(Json(ProfileResponse { user }))
}

/// Email a password reset link
#[utoipa::path(
    post,
    path = "/users/password-reset",
    tag = "users",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent", body = MessageResponse),
        (status = 400, description = "Unknown user")
    )
)]
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    request.validate()?;

    state.auth_service.forgot_password(&request.username).await?;

    Ok(Json(MessageResponse::new("Password reset link sent to your email")))
}

/// Redeem a reset link for a fresh session
#[utoipa::path(
    get,
    path = "/users/reset-password/{token}",
    tag = "users",
    params(("token" = String, Path, description = "Token from the reset email")),
    responses(
        (status = 200, description = "Access token in body, refresh token in cookie", body = AccessTokenResponse),
        (status = 400, description = "Invalid or expired link")
    )
)]
pub async fn reset_password_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(token): Path<String>,
) -> Result<(CookieJar, Json<AccessTokenResponse>), AuthError> {
    let pair = state
        .auth_service
        .reset_password(&token)
        .await
        .map_err(AuthError::into_link_error)?;

    Ok(session_response(jar, pair, state.cookie_secure))
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/users/password-update",
    tag = "users",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid password or user no longer exists"),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn change_password_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    request.validate()?;

    state
        .auth_service
        .change_password(&user.username, &request.password)
        .await?;

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// Delete the caller's own account
#[utoipa::path(
    delete,
    path = "/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn delete_me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>, AuthError> {
    let profile = state.auth_service.get_profile(&user.username).await?;
    state.auth_service.delete_user(profile.id, &user.username).await?;

    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// List all non-admin users (admin only)
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    responses(
        (status = 200, description = "All users with role 'user'", body = UsersResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_users_handler(State(state): State<AppState>) -> Result<Json<UsersResponse>, AuthError> {
    let users = state.auth_service.find_users().await?;
    Ok(Json(UsersResponse { users }))
}

/// Delete a user by ID (admin only)
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "User not found"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn delete_user_handler(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AuthError> {
    state.auth_service.delete_user(id, &admin.username).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
