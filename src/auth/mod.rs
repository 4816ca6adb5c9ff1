// Authentication module
// Registration with email verification, login, refresh rotation, password reset and role checks

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::{require_admin, AuthenticatedUser, RequireRole};
pub use models::{Role, User, UserResponse};
pub use repository::{UserRepository, UserStore};
pub use service::{AuthService, TokenPair};
pub use token::TokenService;
