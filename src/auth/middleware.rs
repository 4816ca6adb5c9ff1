// Authentication middleware for protected routes

use axum::{
    async_trait,
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{error::AuthError, models::Role, token::TokenService};

/// Identity proven by a valid access token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub username: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Extract and validate the bearer access token from request headers
pub fn authenticate(tokens: &TokenService, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedToken)?;

    // Verify Bearer token format
    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MalformedToken)?;

    let claims = tokens.validate_access_token(token)?;
    let role = claims.role.ok_or(AuthError::InvalidToken)?;

    Ok(AuthenticatedUser {
        username: claims.sub,
        role,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already authenticated by a route layer
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let tokens = Arc::<TokenService>::from_ref(state);
        authenticate(&tokens, &parts.headers)
    }
}

/// Authorization guard that requires a specific role
#[derive(Debug, Clone, Copy)]
pub struct RequireRole {
    required_role: Role,
}

impl RequireRole {
    /// Create a guard with the specified role requirement
    pub fn new(required_role: Role) -> Self {
        Self { required_role }
    }

    /// Create a guard that requires Admin role
    pub fn admin() -> Self {
        Self::new(Role::Admin)
    }

    /// Authenticate the request and check the role; exact match only
    pub fn check(&self, tokens: &TokenService, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let user = authenticate(tokens, headers)?;

        if user.role != self.required_role {
            return Err(AuthError::InsufficientPermissions {
                required: self.required_role,
                actual: user.role,
            });
        }

        Ok(user)
    }

    /// Middleware body: on success the identity is stored in request extensions
    pub async fn middleware(
        self,
        tokens: &TokenService,
        mut request: Request<Body>,
        next: Next,
    ) -> Result<Response, AuthError> {
        // Extract endpoint path for logging
        let endpoint = request.uri().path().to_string();

        let user = self.check(tokens, request.headers()).map_err(|e| {
            warn!(
                "Authorization failed: required_role={}, endpoint={}, reason={}",
                self.required_role, endpoint, e
            );
            e
        })?;

        debug!(
            "Authorization successful: user={}, role={}, endpoint={}",
            user.username, user.role, endpoint
        );
        request.extensions_mut().insert(user);
        Ok(next.run(request).await)
    }
}

/// Route layer for admin-only routes
pub async fn require_admin(
    State(tokens): State<Arc<TokenService>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    RequireRole::admin().middleware(&tokens, request, next).await
}
