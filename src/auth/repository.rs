// Credential store for user records

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{NewUser, Role, User},
};

const USER_COLUMNS: &str =
    "id, first_name, last_name, username, email, password_hash, role, is_active, created_at";

/// Unique index ensuring at most one admin exists
const SINGLE_ADMIN_CONSTRAINT: &str = "users_single_admin_idx";
const EMAIL_CONSTRAINT: &str = "users_email_key";
const USERNAME_CONSTRAINT: &str = "users_username_key";

/// Persistence operations the auth workflow needs
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Store a new, inactive user.
    ///
    /// The role is decided by the store in the same write: the first user
    /// ever stored becomes `Admin`, every later user `User`. Uniqueness
    /// violations map to `DuplicateEmail` / `DuplicateUsername`.
    async fn insert_user(&self, user: &NewUser) -> Result<User, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Mark a user as verified; returns false if no such user
    async fn activate(&self, username: &str) -> Result<bool, AuthError>;

    /// Replace a user's password hash; returns false if no such user
    async fn update_password_hash(&self, username: &str, password_hash: &str) -> Result<bool, AuthError>;

    /// Physically remove a user; returns false if nothing was deleted
    async fn delete(&self, id: Uuid) -> Result<bool, AuthError>;

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, AuthError>;
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_with_role(&self, user: &NewUser, role: Role) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, first_name, last_name, username, email, password_hash, role, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    async fn has_any_user(&self) -> Result<bool, AuthError> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users)")
            .fetch_one(&self.pool)
            .await?;
        Ok(exists.0)
    }
}

/// Name of the unique constraint a database error violated, if any
fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

fn map_insert_error(err: sqlx::Error) -> AuthError {
    match violated_constraint(&err).as_deref() {
        Some(EMAIL_CONSTRAINT) => AuthError::DuplicateEmail,
        Some(USERNAME_CONSTRAINT) => AuthError::DuplicateUsername,
        _ => AuthError::DatabaseError(err.to_string()),
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn insert_user(&self, user: &NewUser) -> Result<User, AuthError> {
        let role = if self.has_any_user().await? { Role::User } else { Role::Admin };

        match self.insert_with_role(user, role).await {
            Ok(created) => Ok(created),
            // Another registration claimed the admin slot between the check and the insert
            Err(err) if violated_constraint(&err).as_deref() == Some(SINGLE_ADMIN_CONSTRAINT) => {
                tracing::info!("Admin slot already taken, storing '{}' as user", user.username);
                self.insert_with_role(user, Role::User)
                    .await
                    .map_err(map_insert_error)
            }
            Err(err) => Err(map_insert_error(err)),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn activate(&self, username: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE users SET is_active = TRUE WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_password_hash(&self, username: &str, password_hash: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE username = $2")
            .bind(password_hash)
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DeletionError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, AuthError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE role = $1 ORDER BY created_at",
            USER_COLUMNS
        ))
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
