//! Configuration management for the API server
//!
//! Loaded from environment variables (a `.env` file is read first when
//! present).
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
//! - `API_HOST`: host to bind to (default: 0.0.0.0)
//! - `API_PORT`: port to bind to (default: 8080)
//! - `JWT_SECRET`: secret key for JWT signing, at least 32 characters (required)
//! - `CORS_ORIGINS`: comma separated origins, `*` for any (default: `*`)
//! - `PRODUCTION`: enables HSTS and `Secure` cookies (default: false)
//! - `SESSION_COOKIE_NAME`: session cookie (default: `session_token`)
//! - `COMPANY_COOKIE_NAME`: company switcher cookie (default: `activeCompanyId`)
//! - `CACHE_TTL_SECS`: dashboard cache lifetime (default: 30)
//! - `LOG_FORMAT`: `json` for JSON logs, anything else for text

use propdesk_shared::scope::DEFAULT_COMPANY_COOKIE;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Default session cookie name
pub const DEFAULT_SESSION_COOKIE: &str = "session_token";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub cache: CacheConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS, secure cookies)
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 characters. Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub session_cookie: String,
    pub company_cookie: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            company_cookie: DEFAULT_COMPANY_COOKIE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Dashboard summary time to live, in seconds
    pub ttl_secs: u64,
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {message}")]
    Invalid { name: &'static str, message: String },

    #[error("JWT_SECRET must be at least 32 characters long")]
    WeakJwtSecret,
}

/// Shortest accepted `JWT_SECRET`
pub const MIN_JWT_SECRET_LEN: usize = 32;

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret);
        }

        let cors_origins = var("CORS_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_else(|| vec!["*".to_string()]);

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or("API_PORT", var("API_PORT"), 8080)?,
                cors_origins,
                production: var("PRODUCTION").map(|v| parse_bool(&v)).unwrap_or(false),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or("DATABASE_MAX_CONNECTIONS", var("DATABASE_MAX_CONNECTIONS"), 10)?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            session: SessionConfig {
                session_cookie: var("SESSION_COOKIE_NAME").unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
                company_cookie: var("COMPANY_COOKIE_NAME").unwrap_or_else(|| DEFAULT_COMPANY_COOKIE.to_string()),
            },
            cache: CacheConfig {
                ttl_secs: parse_or("CACHE_TTL_SECS", var("CACHE_TTL_SECS"), 30)?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    let origins: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();

    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            session: SessionConfig::default(),
            cache: CacheConfig { ttl_secs: 30 },
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.cache.ttl_secs, 30);
        assert!(config.allows_any_origin());
        assert!(!config.api.production);
    }

    #[test]
    fn test_from_vars_errors() {
        assert_eq!(
            Config::from_vars(vars(&[("JWT_SECRET", SECRET)])).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        assert_eq!(
            Config::from_vars(vars(&[
                ("DATABASE_URL", "postgresql://localhost/test"),
                ("JWT_SECRET", "short"),
            ]))
            .unwrap_err(),
            ConfigError::WeakJwtSecret
        );

        let err = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "API_PORT", .. }));
        assert!(err.to_string().starts_with("API_PORT is invalid"));
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(sample().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://app.example.com, https://admin.example.com"),
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert_eq!(parse_origins(" , "), vec!["*"]);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool(" YES "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_session_defaults() {
        let session = SessionConfig::default();
        assert_eq!(session.session_cookie, "session_token");
        assert_eq!(session.company_cookie, "activeCompanyId");
    }

    #[test]
    fn test_any_origin() {
        let mut config = sample();
        assert!(config.allows_any_origin());
        config.api.cors_origins = vec!["https://app.example.com".to_string()];
        assert!(!config.allows_any_origin());
    }
}
