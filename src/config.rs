//! Application Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Longest accepted token lifetime in seconds (ten years)
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{0}")]
    Rejected(String),
}

fn require_env(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Top-level configuration for the API server
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    /// Load every section from the environment and validate it
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = match env::var("BIND_ADDR") {
            Ok(addr) => addr,
            Err(_) => format!("0.0.0.0:{}", parse_env::<u16>("PORT", 3000)?),
        };

        let auth = AuthConfig::from_env()?;
        auth.validate()?;

        Ok(Self {
            bind_addr,
            database: DatabaseConfig::from_env()?,
            auth,
            mail: MailConfig::from_env()?,
        })
    }
}

/// PostgreSQL connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection string (from DATABASE_URL env var)
    pub url: String,

    /// Pool size (from DATABASE_MAX_CONNECTIONS env var)
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: require_env("DATABASE_URL")?,
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
        })
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone)]
pub struct HashingConfig {
    /// Memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub memory_cost: u32,

    /// Iterations (from ARGON2_TIME_COST env var)
    pub time_cost: u32,

    /// Lanes (from ARGON2_PARALLELISM env var)
    pub parallelism: u32,
}

impl HashingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            memory_cost: parse_env("ARGON2_MEMORY_COST", 19456)?, // 19 MiB
            time_cost: parse_env("ARGON2_TIME_COST", 2)?,
            parallelism: parse_env("ARGON2_PARALLELISM", 1)?,
        })
    }
}

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret for signing access tokens (from JWT_SECRET env var)
    pub access_secret: String,

    /// Secret for signing refresh tokens (from JWT_REFRESH_SECRET env var)
    pub refresh_secret: String,

    /// Access token lifetime in seconds (from JWT_ACCESS_EXPIRATION env var)
    pub access_token_expiration: i64,

    /// Refresh token lifetime in seconds (from JWT_REFRESH_EXPIRATION env var)
    pub refresh_token_expiration: i64,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// JWT audience (from JWT_AUDIENCE env var)
    pub jwt_audience: String,

    /// Password hashing cost
    pub hashing: HashingConfig,

    /// Mint a refresh token on every authenticated request and return it in
    /// the `X-Refresh-Token` header (from ROTATE_REFRESH_ON_REQUEST env var)
    pub rotate_refresh_on_request: bool,

    /// Deadline for a single token store call in milliseconds (from STORE_TIMEOUT_MS env var)
    pub store_timeout_ms: u64,
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_secret: require_env("JWT_SECRET")?,
            refresh_secret: require_env("JWT_REFRESH_SECRET")?,
            access_token_expiration: parse_env("JWT_ACCESS_EXPIRATION", 900)?, // 15 minutes
            refresh_token_expiration: parse_env("JWT_REFRESH_EXPIRATION", 604800)?, // 7 days
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "portfolio-api".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "portfolio-clients".to_string()),
            hashing: HashingConfig::from_env()?,
            rotate_refresh_on_request: env::var("ROTATE_REFRESH_ON_REQUEST")
                .map(|v| !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            store_timeout_ms: parse_env("STORE_TIMEOUT_MS", 5000)?,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.len() < 32 {
            return Err(ConfigError::Rejected(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.refresh_secret.len() < 32 {
            return Err(ConfigError::Rejected(
                "JWT_REFRESH_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.access_token_expiration <= 0 {
            return Err(ConfigError::Rejected(
                "JWT_ACCESS_EXPIRATION must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiration > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Rejected(format!(
                "JWT_REFRESH_EXPIRATION must not exceed {MAX_TOKEN_TTL_SECS} seconds"
            )));
        }

        if self.refresh_token_expiration <= self.access_token_expiration {
            return Err(ConfigError::Rejected(
                "JWT_REFRESH_EXPIRATION must be greater than JWT_ACCESS_EXPIRATION".to_string(),
            ));
        }

        if self.store_timeout_ms == 0 {
            return Err(ConfigError::Rejected(
                "STORE_TIMEOUT_MS must be positive".to_string(),
            ));
        }

        if self.access_secret == self.refresh_secret {
            tracing::warn!("JWT_SECRET and JWT_REFRESH_SECRET are identical");
        }

        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Outbound mail settings for the contact endpoint
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP relay host (from SMTP_HOST env var)
    pub smtp_host: String,

    /// Mailbox that both sends and receives contact messages (from EMAIL_USER env var)
    pub username: String,

    /// App password for the mailbox (from EMAIL_APP_PASSWORD env var)
    pub password: String,
}

impl MailConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            username: require_env("EMAIL_USER")?,
            password: require_env("EMAIL_APP_PASSWORD")?,
        })
    }
}

#[cfg(test)]
impl AuthConfig {
    /// Cheap settings for unit tests
    pub(crate) fn for_tests() -> Self {
        Self {
            access_secret: "a".repeat(32),
            refresh_secret: "r".repeat(32),
            access_token_expiration: 900,
            refresh_token_expiration: 604800,
            jwt_issuer: "test".to_string(),
            jwt_audience: "test".to_string(),
            hashing: HashingConfig {
                memory_cost: 1024,
                time_cost: 1,
                parallelism: 1,
            },
            rotate_refresh_on_request: true,
            store_timeout_ms: 5000,
        }
    }
}
