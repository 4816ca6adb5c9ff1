// JWT token generation and validation service

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::{error::AuthError, models::Role};

/// Access tokens expire in 24 hours
pub const ACCESS_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
/// Refresh tokens expire in 7 days; the refresh cookie max-age is derived from this
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;
/// Verification and password reset links expire in 10 minutes
pub const RESET_TOKEN_TTL_SECS: i64 = 10 * 60;

/// Purpose a token was minted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Reset,
}

impl TokenKind {
    pub fn lifetime_secs(&self) -> i64 {
        match self {
            TokenKind::Access => ACCESS_TOKEN_TTL_SECS,
            TokenKind::Refresh => REFRESH_TOKEN_TTL_SECS,
            TokenKind::Reset => RESET_TOKEN_TTL_SECS,
        }
    }

    /// Refresh tokens carry the username only
    fn carries_role(&self) -> bool {
        !matches!(self, TokenKind::Refresh)
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub kind: TokenKind,
    pub jti: String,
    pub iat: i64, // issued at timestamp
    pub exp: i64, // expiration timestamp
}

/// Token service for JWT operations
///
/// One HS256 secret signs all three token kinds; the `kind` claim keeps a
/// reset link from being replayed as an access token.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    /// Create a new TokenService with secret key
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Generate an access token (24 hours)
    pub fn generate_access_token(&self, username: &str, role: Role) -> Result<String, AuthError> {
        self.issue(TokenKind::Access, username, Some(role))
    }

    /// Generate a refresh token (7 days)
    pub fn generate_refresh_token(&self, username: &str) -> Result<String, AuthError> {
        self.issue(TokenKind::Refresh, username, None)
    }

    /// Generate a verification / password reset token (10 minutes)
    pub fn generate_reset_token(&self, username: &str, role: Role) -> Result<String, AuthError> {
        self.issue(TokenKind::Reset, username, Some(role))
    }

    /// Generate both access and refresh tokens
    pub fn generate_token_pair(&self, username: &str, role: Role) -> Result<(String, String), AuthError> {
        let access_token = self.generate_access_token(username, role)?;
        let refresh_token = self.generate_refresh_token(username)?;
        Ok((access_token, refresh_token))
    }

    pub fn issue(&self, kind: TokenKind, username: &str, role: Option<Role>) -> Result<String, AuthError> {
        self.issue_at(kind, username, role, Utc::now().timestamp())
    }

    /// Sign a token of `kind` as if issued at `now` (unix seconds)
    pub fn issue_at(
        &self,
        kind: TokenKind,
        username: &str,
        role: Option<Role>,
        now: i64,
    ) -> Result<String, AuthError> {
        if kind.carries_role() && role.is_none() {
            return Err(AuthError::TokenGenerationError(format!("{:?} token requires a role", kind)));
        }

        let claims = Claims {
            sub: username.to_string(),
            role: if kind.carries_role() { role } else { None },
            kind,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + kind.lifetime_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Validate an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.parse(TokenKind::Access, token)
    }

    /// Validate a refresh token
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.parse(TokenKind::Refresh, token)
    }

    /// Validate a verification / reset token
    pub fn validate_reset_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.parse(TokenKind::Reset, token)
    }

    pub fn parse(&self, expected: TokenKind, token: &str) -> Result<Claims, AuthError> {
        self.parse_at(expected, token, Utc::now().timestamp())
    }

    /// Decode and check a token against the clock reading `now` (unix seconds)
    ///
    /// A token is valid iff its signature verifies, its kind matches
    /// `expected`, and `now < exp`.
    pub fn parse_at(&self, expected: TokenKind, token: &str, now: i64) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against `now` with zero leeway
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::ImmatureSignature => AuthError::InvalidToken,
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::MalformedToken,
            })?;

        if claims.kind != expected {
            tracing::warn!(
                "Token kind mismatch: expected {:?}, got {:?} (fingerprint {})",
                expected,
                claims.kind,
                fingerprint(token)
            );
            return Err(AuthError::InvalidToken);
        }

        if now >= claims.exp {
            return Err(AuthError::ExpiredToken);
        }

        if claims.sub.trim().is_empty() || (expected.carries_role() && claims.role.is_none()) {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }
}

/// Short SHA-256 digest of a token, safe to write to logs
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{:x}", digest).chars().take(12).collect()
}
