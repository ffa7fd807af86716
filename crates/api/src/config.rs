//! Process configuration, read once from the environment at startup.

use std::collections::HashMap;

use chrono::Duration;
use thiserror::Error;

use quill_auth::codec::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_ISSUER, DEFAULT_REFRESH_TTL_SECS};
use quill_auth::{password, TokenConfig};

pub const DEFAULT_ENV_FILE: &str = "dev.env";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set and non-empty")]
    Missing(&'static str),

    #[error("{name} is not a valid number: '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("JWT_SECRET_KEY and JWT_REFRESH_KEY must differ")]
    SharedSecret,

    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

/// Optional account created at startup with the admin role.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub mode: String,
    pub prefix: String,
    pub tokens: TokenConfig,
    pub password_cost: u32,
    pub admin: Option<AdminSeed>,
}

impl AppConfig {
    /// Read from the process environment, after loading `APP_ENV_FILE`
    /// (default `dev.env`) if such a file exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_file = std::env::var("APP_ENV_FILE").unwrap_or_else(|_| DEFAULT_ENV_FILE.to_string());
        match dotenv::from_filename(&env_file) {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded env file"),
            Err(e) => tracing::debug!(file = %env_file, error = %e, "no env file loaded"),
        }

        Self::from_vars(std::env::vars().collect())
    }

    /// Build from an explicit variable map (no process-global lookups).
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

        // Secrets are used byte-for-byte; whitespace only counts against emptiness.
        let secret = |name: &'static str| {
            vars.get(name)
                .map(String::as_str)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let access_secret = secret("JWT_SECRET_KEY")?;
        let refresh_secret = secret("JWT_REFRESH_KEY")?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let access_ttl = parse_number(&vars, "JWT_ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_ttl = parse_number(&vars, "JWT_REFRESH_TTL_SECS", DEFAULT_REFRESH_TTL_SECS)?;
        if access_ttl <= 0 {
            return Err(ConfigError::NonPositive("JWT_ACCESS_TTL_SECS"));
        }
        if refresh_ttl <= 0 {
            return Err(ConfigError::NonPositive("JWT_REFRESH_TTL_SECS"));
        }

        let tokens = TokenConfig::new(access_secret, refresh_secret)
            .with_ttls(Duration::seconds(access_ttl), Duration::seconds(refresh_ttl))
            .with_issuer(get("JWT_ISSUER").unwrap_or(DEFAULT_ISSUER));

        let admin = match (get("ADMIN_EMAIL"), secret("ADMIN_PASSWORD").ok()) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email: email.to_string(),
                password: password.to_string(),
            }),
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            _ => None,
        };

        let password_cost = parse_number(&vars, "PASSWORD_HASH_COST", password::DEFAULT_COST)?;
        if !(password::MIN_COST..=password::MAX_COST).contains(&password_cost) {
            return Err(ConfigError::OutOfRange {
                name: "PASSWORD_HASH_COST",
                value: password_cost,
                min: password::MIN_COST,
                max: password::MAX_COST,
            });
        }

        Ok(Self {
            port: parse_number(&vars, "APP_PORT", 4000)?,
            mode: get("APP_MODE").unwrap_or("dev").to_string(),
            prefix: normalize_prefix(get("APP_PREFIX").unwrap_or("/api/v1")),
            tokens,
            password_cost,
            admin,
        })
    }

    /// Config suitable for tests: fixed secrets, cheap hashing.
    pub fn for_tests(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            port: 0,
            mode: "test".to_string(),
            prefix: "/api/v1".to_string(),
            tokens: TokenConfig::new(access_secret, refresh_secret),
            password_cost: 4,
            admin: None,
        }
    }
}

fn parse_number<T: core::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        }),
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
