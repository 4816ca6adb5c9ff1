// Application configuration loaded from the environment

use std::time::Duration;

/// Errors raised while reading configuration at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration for the Loan Tracker API
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    /// Base URL used when building verification and reset links
    pub public_base_url: String,
    /// Mail relay endpoint; links are only logged when unset
    pub notify_webhook_url: Option<String>,
    /// Upper bound for every store, notifier and audit call
    pub dependency_timeout: Duration,
    pub request_timeout: Duration,
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", lookup("PORT"), 8080u16)?;
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();
        let notify_webhook_url = lookup("NOTIFY_WEBHOOK_URL").filter(|url| !url.is_empty());

        let dependency_timeout_secs =
            parse_or("DEPENDENCY_TIMEOUT_SECS", lookup("DEPENDENCY_TIMEOUT_SECS"), 5u64)?;
        let request_timeout_secs =
            parse_or("REQUEST_TIMEOUT_SECS", lookup("REQUEST_TIMEOUT_SECS"), 30u64)?;
        let cookie_secure = parse_or("COOKIE_SECURE", lookup("COOKIE_SECURE"), false)?;

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            public_base_url,
            notify_webhook_url,
            dependency_timeout: Duration::from_secs(dependency_timeout_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            cookie_secure,
        })
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
