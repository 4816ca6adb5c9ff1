// Authentication service - business logic layer

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{NewUser, RegisterRequest, Role, User, UserResponse},
    password::PasswordService,
    repository::UserStore,
    token::{fingerprint, TokenService},
};
use crate::deadline::bounded;
use crate::logs::{audit::AuditLogger, models::AuditAction};
use crate::notifications::{Notification, NotificationError, NotificationSender};

/// Access and refresh token minted together
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Authentication service coordinating all auth operations
pub struct AuthService {
    users: Arc<dyn UserStore>,
    notifier: Arc<dyn NotificationSender>,
    audit: AuditLogger,
    tokens: Arc<TokenService>,
    public_base_url: String,
    timeout: Duration,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        users: Arc<dyn UserStore>,
        notifier: Arc<dyn NotificationSender>,
        audit: AuditLogger,
        tokens: Arc<TokenService>,
        public_base_url: String,
        timeout: Duration,
    ) -> Self {
        Self {
            users,
            notifier,
            audit,
            tokens,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Register a new user and email them a verification link.
    ///
    /// The user is stored inactive before the email goes out; a failed send
    /// leaves the record in place and reports `NotificationError`.
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, AuthError> {
        if self.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }
        if self.find_by_username(&request.username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }

        let password_hash = hash_off_thread(request.password).await?;

        let new_user = NewUser {
            first_name: request.first_name,
            last_name: request.last_name,
            username: request.username,
            email: request.email,
            password_hash,
        };
        let user = bounded("users.insert", self.timeout, self.users.insert_user(&new_user)).await?;

        tracing::info!("Registered user '{}' with role {}", user.username, user.role);

        // Verification reuses the short-lived reset token
        let token = self.tokens.generate_reset_token(&user.username, user.role)?;
        let link = format!("{}/users/verify-email/{}", self.public_base_url, token);
        self.notify(Notification::verification(&user.email, &link)).await?;

        self.audit
            .record(&user.username, AuditAction::UserRegistered, format!("Registered {}", user.email))
            .await;

        Ok(UserResponse::from(user))
    }

    /// Activate the account named by a verification token. Idempotent.
    pub async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.tokens.validate_reset_token(token)?;

        let activated = bounded("users.activate", self.timeout, self.users.activate(&claims.sub)).await?;
        if !activated {
            return Err(AuthError::UserNotFound);
        }

        tracing::info!("Verified user '{}'", claims.sub);
        self.audit
            .record(&claims.sub, AuditAction::UserVerified, "Email address verified")
            .await;
        Ok(())
    }

    /// Authenticate with username and password.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to the
    /// caller. Unverified accounts receive no tokens.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_off_thread(user.password_hash.clone(), password.to_string())
            .await
            .map_err(|e| match e {
                AuthError::PasswordMismatch => AuthError::InvalidCredentials,
                other => other,
            })?;

        if !user.is_active {
            tracing::debug!("Login refused for unverified user '{}'", user.username);
            return Err(AuthError::AccountNotVerified);
        }

        let pair = self.issue_pair(&user)?;

        tracing::info!("User '{}' logged in", user.username);
        self.audit
            .record(&user.username, AuditAction::UserLoggedIn, "Logged in")
            .await;
        Ok(pair)
    }

    /// Exchange a refresh token for a fresh pair.
    ///
    /// The role is re-read from the store so promotions and demotions
    /// take effect at the next refresh.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.validate_refresh_token(refresh_token)?;

        let user = self.find_by_username(&claims.sub).await?.ok_or_else(|| {
            tracing::warn!(
                "Refresh token {} names a user that no longer exists",
                fingerprint(refresh_token)
            );
            AuthError::InvalidToken
        })?;

        self.issue_pair(&user)
    }

    /// Email a password reset link to the named user
    pub async fn forgot_password(&self, username: &str) -> Result<(), AuthError> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = self.tokens.generate_reset_token(&user.username, user.role)?;
        let link = format!("{}/users/reset-password/{}", self.public_base_url, token);
        self.notify(Notification::password_reset(&user.email, &link)).await?;

        self.audit
            .record(&user.username, AuditAction::PasswordResetRequested, "Password reset link sent")
            .await;
        Ok(())
    }

    /// Trade a reset token for a regular session.
    ///
    /// The password is not changed here; the client follows up with
    /// `change_password` using the returned access token.
    pub async fn reset_password(&self, token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.validate_reset_token(token)?;

        let user = self
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        tracing::info!("Reset link redeemed by '{}'", user.username);
        self.issue_pair(&user)
    }

    /// Replace the password of an authenticated user. Both outcomes are audited.
    pub async fn change_password(&self, username: &str, new_password: &str) -> Result<(), AuthError> {
        let result = self.replace_password_hash(username, new_password).await;

        match &result {
            Ok(()) => {
                tracing::info!("Password changed for '{}'", username);
                self.audit
                    .record(username, AuditAction::PasswordChanged, "Password updated")
                    .await;
            }
            Err(e) => {
                tracing::warn!("Password change failed for '{}': {}", username, e);
                self.audit
                    .record(username, AuditAction::PasswordChangeFailed, e.to_string())
                    .await;
            }
        }

        result
    }

    async fn replace_password_hash(&self, username: &str, new_password: &str) -> Result<(), AuthError> {
        let password_hash = hash_off_thread(new_password.to_string()).await?;

        let updated = bounded(
            "users.update_password",
            self.timeout,
            self.users.update_password_hash(username, &password_hash),
        )
        .await?;

        if updated {
            Ok(())
        } else {
            Err(AuthError::UserNotFound)
        }
    }

    /// Remove a user record; `actor` is whoever asked for the deletion
    pub async fn delete_user(&self, id: Uuid, actor: &str) -> Result<(), AuthError> {
        let user = bounded("users.find_by_id", self.timeout, self.users.find_by_id(id))
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let deleted = bounded("users.delete", self.timeout, self.users.delete(id)).await?;
        if !deleted {
            return Err(AuthError::DeletionError(format!("no rows removed for user {}", id)));
        }

        tracing::info!("User '{}' deleted by '{}'", user.username, actor);
        self.audit
            .record(actor, AuditAction::UserDeleted, format!("Deleted user {} ({})", user.username, id))
            .await;
        Ok(())
    }

    /// All non-admin users
    pub async fn find_users(&self) -> Result<Vec<UserResponse>, AuthError> {
        let users = bounded("users.list_by_role", self.timeout, self.users.list_by_role(Role::User)).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn get_profile(&self, username: &str) -> Result<UserResponse, AuthError> {
        self.find_by_username(username)
            .await?
            .map(UserResponse::from)
            .ok_or(AuthError::UserNotFound)
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let (access_token, refresh_token) = self.tokens.generate_token_pair(&user.username, user.role)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        bounded("users.find_by_email", self.timeout, self.users.find_by_email(email)).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        bounded("users.find_by_username", self.timeout, self.users.find_by_username(username)).await
    }

    async fn notify(&self, notification: Notification) -> Result<(), AuthError> {
        let sent: Result<(), NotificationError> =
            bounded("notifier.send", self.timeout, self.notifier.send(&notification)).await;

        sent.map_err(|e| {
            tracing::error!("Failed to send '{}' to {}: {}", notification.subject, notification.to, e);
            AuthError::NotificationError(e.to_string())
        })
    }
}

/// Argon2 is CPU-bound; keep it off the async workers
async fn hash_off_thread(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || PasswordService::hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!("Password hashing task failed: {}", e);
            AuthError::PasswordHashError
        })?
}

async fn verify_off_thread(hash: String, password: String) -> Result<(), AuthError> {
    tokio::task::spawn_blocking(move || PasswordService::verify_password(&hash, &password))
        .await
        .map_err(|e| {
            tracing::error!("Password verification task failed: {}", e);
            AuthError::PasswordHashError
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHarness;

    fn request(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            username: username.to_string(),
            password: "hunter22".to_string(),
            email: email.to_string(),
        }
    }

    async fn registered_and_verified(h: &TestHarness, username: &str, email: &str) {
        h.auth.register(request(username, email)).await.unwrap();
        let token = h.notifier.last_token_for(email).unwrap();
        h.auth.verify_email(&token).await.unwrap();
    }

    #[tokio::test]
    async fn test_first_registration_is_admin() {
        let h = TestHarness::new();

        let alice = h.auth.register(request("alice", "a@x.com")).await.unwrap();
        let bob = h.auth.register(request("bob", "b@x.com")).await.unwrap();

        assert_eq!(alice.role, Role::Admin);
        assert_eq!(bob.role, Role::User);
        assert!(!alice.is_active);
        assert!(!bob.is_active);
    }

    #[tokio::test]
    async fn test_register_sends_verification_link() {
        let h = TestHarness::new();
        h.auth.register(request("alice", "a@x.com")).await.unwrap();

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert!(sent[0]
            .link
            .starts_with("http://localhost:8080/users/verify-email/"));

        let token = h.notifier.last_token_for("a@x.com").unwrap();
        let claims = h.tokens.validate_reset_token(&token).unwrap();
        assert_eq!(claims.sub, "alice");
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_plaintext() {
        let h = TestHarness::new();
        h.auth.register(request("alice", "a@x.com")).await.unwrap();

        let stored = h.users.get("alice").unwrap();
        assert_ne!(stored.password_hash, "hunter22");
        assert!(PasswordService::verify_password(&stored.password_hash, "hunter22").is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_email_checked_before_username() {
        let h = TestHarness::new();
        h.auth.register(request("alice", "a@x.com")).await.unwrap();

        let same_both = h.auth.register(request("alice", "a@x.com")).await;
        assert_eq!(same_both.unwrap_err(), AuthError::DuplicateEmail);

        let same_email = h.auth.register(request("carol", "A@X.com")).await;
        assert_eq!(same_email.unwrap_err(), AuthError::DuplicateEmail);

        let same_username = h.auth.register(request("alice", "other@x.com")).await;
        assert_eq!(same_username.unwrap_err(), AuthError::DuplicateUsername);

        assert_eq!(h.users.len(), 1);
    }

    #[tokio::test]
    async fn test_register_notification_failure_keeps_user() {
        let h = TestHarness::new();
        h.notifier.set_failing(true);

        let result = h.auth.register(request("alice", "a@x.com")).await;

        assert!(matches!(result, Err(AuthError::NotificationError(_))));
        let stored = h.users.get("alice").unwrap();
        assert!(!stored.is_active);
        assert!(h.audit_sink.entries().is_empty());
    }

    #[tokio::test]
    async fn test_register_survives_audit_failure() {
        let h = TestHarness::with_failing_audit();
        let user = h.auth.register(request("alice", "a@x.com")).await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_verify_email_is_idempotent() {
        let h = TestHarness::new();
        h.auth.register(request("alice", "a@x.com")).await.unwrap();
        let token = h.notifier.last_token_for("a@x.com").unwrap();

        h.auth.verify_email(&token).await.unwrap();
        h.auth.verify_email(&token).await.unwrap();

        assert!(h.users.get("alice").unwrap().is_active);
    }

    #[tokio::test]
    async fn test_verify_email_rejects_other_token_kinds() {
        let h = TestHarness::new();
        h.auth.register(request("alice", "a@x.com")).await.unwrap();

        let access = h.tokens.generate_access_token("alice", Role::Admin).unwrap();
        assert_eq!(h.auth.verify_email(&access).await.unwrap_err(), AuthError::InvalidToken);
        assert!(!h.users.get("alice").unwrap().is_active);
    }

    #[tokio::test]
    async fn test_verify_email_for_deleted_user() {
        let h = TestHarness::new();
        h.auth.register(request("alice", "a@x.com")).await.unwrap();
        let token = h.notifier.last_token_for("a@x.com").unwrap();
        h.users.remove("alice");

        assert_eq!(h.auth.verify_email(&token).await.unwrap_err(), AuthError::UserNotFound);
    }

    #[tokio::test]
    async fn test_login_requires_verification() {
        let h = TestHarness::new();
        h.auth.register(request("alice", "a@x.com")).await.unwrap();

        let result = h.auth.login("alice", "hunter22").await;

        assert_eq!(result.unwrap_err(), AuthError::AccountNotVerified);
        assert!(!h.audit_sink.actions().contains(&"User Logged In".to_string()));
    }

    #[tokio::test]
    async fn test_login_does_not_reveal_which_part_was_wrong() {
        let h = TestHarness::new();
        registered_and_verified(&h, "alice", "a@x.com").await;

        let unknown = h.auth.login("nobody", "hunter22").await.unwrap_err();
        let wrong = h.auth.login("alice", "wrong").await.unwrap_err();

        assert_eq!(unknown, AuthError::InvalidCredentials);
        assert_eq!(wrong, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_login_issues_pair_and_audits() {
        let h = TestHarness::new();
        registered_and_verified(&h, "alice", "a@x.com").await;

        let pair = h.auth.login("alice", "hunter22").await.unwrap();

        let access = h.tokens.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(access.sub, "alice");
        assert_eq!(access.role, Some(Role::Admin));
        assert_eq!(h.tokens.validate_refresh_token(&pair.refresh_token).unwrap().sub, "alice");
        assert_eq!(
            h.audit_sink.actions(),
            vec!["User Registered", "User Verified", "User Logged In"]
        );
    }

    #[tokio::test]
    async fn test_refresh_picks_up_current_role() {
        let h = TestHarness::new();
        h.auth.register(request("alice", "a@x.com")).await.unwrap();
        registered_and_verified(&h, "bob", "b@x.com").await;

        let pair = h.auth.login("bob", "hunter22").await.unwrap();
        h.users.set_role("bob", Role::Admin);

        let refreshed = h.auth.refresh_tokens(&pair.refresh_token).await.unwrap();

        let claims = h.tokens.validate_access_token(&refreshed.access_token).unwrap();
        assert_eq!(claims.role, Some(Role::Admin));
        assert!(h.tokens.validate_refresh_token(&refreshed.refresh_token).is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let h = TestHarness::new();
        registered_and_verified(&h, "alice", "a@x.com").await;
        let pair = h.auth.login("alice", "hunter22").await.unwrap();

        let result = h.auth.refresh_tokens(&pair.access_token).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user_is_invalid() {
        let h = TestHarness::new();
        registered_and_verified(&h, "alice", "a@x.com").await;
        let pair = h.auth.login("alice", "hunter22").await.unwrap();
        h.users.remove("alice");

        let result = h.auth.refresh_tokens(&pair.refresh_token).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_user() {
        let h = TestHarness::new();
        assert_eq!(h.auth.forgot_password("ghost").await.unwrap_err(), AuthError::UserNotFound);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_forgot_then_reset_password_grants_session() {
        let h = TestHarness::new();
        registered_and_verified(&h, "alice", "a@x.com").await;

        h.auth.forgot_password("alice").await.unwrap();

        let sent = h.notifier.sent();
        let last = sent.last().unwrap();
        assert_eq!(last.subject, "Reset Your Password");
        assert!(last.link.starts_with("http://localhost:8080/users/reset-password/"));

        let token = h.notifier.last_token_for("a@x.com").unwrap();
        let pair = h.auth.reset_password(&token).await.unwrap();
        let claims = h.tokens.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "alice");

        // The old password still works until it is changed
        assert!(h.auth.login("alice", "hunter22").await.is_ok());
    }

    #[tokio::test]
    async fn test_forgot_password_notification_failure() {
        let h = TestHarness::new();
        registered_and_verified(&h, "alice", "a@x.com").await;
        h.notifier.set_failing(true);

        let result = h.auth.forgot_password("alice").await;
        assert!(matches!(result, Err(AuthError::NotificationError(_))));
    }

    #[tokio::test]
    async fn test_reset_password_rejects_refresh_token() {
        let h = TestHarness::new();
        registered_and_verified(&h, "alice", "a@x.com").await;
        let pair = h.auth.login("alice", "hunter22").await.unwrap();

        let result = h.auth.reset_password(&pair.refresh_token).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn test_change_password_replaces_credentials() {
        let h = TestHarness::new();
        registered_and_verified(&h, "alice", "a@x.com").await;
        let before = h.auth.login("alice", "hunter22").await.unwrap();

        h.auth.change_password("alice", "correct-horse").await.unwrap();

        assert_eq!(
            h.auth.login("alice", "hunter22").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert!(h.auth.login("alice", "correct-horse").await.is_ok());
        // Tokens are not revoked by a password change
        assert!(h.tokens.validate_access_token(&before.access_token).is_ok());
        assert!(h.audit_sink.actions().contains(&"Password Changed".to_string()));
    }

    #[tokio::test]
    async fn test_change_password_failure_is_audited() {
        let h = TestHarness::new();

        let result = h.auth.change_password("ghost", "whatever").await;

        assert_eq!(result.unwrap_err(), AuthError::UserNotFound);
        let entries = h.audit_sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "Password Change Failed");
        assert_eq!(entries[0].user_id, "ghost");
    }

    #[tokio::test]
    async fn test_delete_user() {
        let h = TestHarness::new();
        registered_and_verified(&h, "alice", "a@x.com").await;
        let bob = h.auth.register(request("bob", "b@x.com")).await.unwrap();

        h.auth.delete_user(bob.id, "alice").await.unwrap();

        assert!(h.users.get("bob").is_none());
        let last = h.audit_sink.entries().pop().unwrap();
        assert_eq!(last.action, "User Deleted");
        assert_eq!(last.user_id, "alice");

        assert_eq!(
            h.auth.delete_user(bob.id, "alice").await.unwrap_err(),
            AuthError::UserNotFound
        );
    }

    #[tokio::test]
    async fn test_find_users_excludes_admin() {
        let h = TestHarness::new();
        h.auth.register(request("alice", "a@x.com")).await.unwrap();
        h.auth.register(request("bob", "b@x.com")).await.unwrap();
        h.auth.register(request("carol", "c@x.com")).await.unwrap();

        let users = h.auth.find_users().await.unwrap();

        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol"]);
    }

    #[tokio::test]
    async fn test_get_profile() {
        let h = TestHarness::new();
        h.auth.register(request("alice", "a@x.com")).await.unwrap();

        let profile = h.auth.get_profile("alice").await.unwrap();
        assert_eq!(profile.email, "a@x.com");
        assert_eq!(h.auth.get_profile("ghost").await.unwrap_err(), AuthError::UserNotFound);
    }
}
