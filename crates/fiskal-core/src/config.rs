//! Fiskal Configuration Management
//!
//! Handles configuration from environment variables with sensible defaults
//! for development. The authentication section is strict: outside of
//! development the process refuses to start without a signing secret.

use serde::{Deserialize, Serialize};

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::InvalidValue {
                key: "APP_ENV".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Deployment environment
    pub environment: Environment,

    /// Server configuration
    pub server: ServerConfig,

    /// Authentication configuration
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(env) = std::env::var("APP_ENV") {
            config.environment = env.parse()?;
        }

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }
        if let Ok(value) = std::env::var("API_TRUST_PROXY") {
            config.server.trust_proxy = match value.as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "API_TRUST_PROXY".to_string(),
                        value: other.to_string(),
                    })
                }
            };
        }

        // Auth
        config.auth = AuthConfig::from_env(config.environment)?;

        Ok(config)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Whether forwarded-for headers are trusted for the client address.
    /// Only enable behind a proxy that strips inbound forwarded headers;
    /// otherwise any client can forge them.
    pub trust_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            trust_proxy: false,
        }
    }
}

/// Authentication configuration
///
/// Tokens carry a fixed 7-day TTL; the expiry is always issuance time plus
/// this TTL, never configured per token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Token issuer identifier
    pub issuer: String,
    /// Token audience identifier
    pub audience: String,
    /// Token lifetime in seconds (fixed at 7 days)
    pub token_ttl_secs: u64,
    /// Secret for the legacy token format, if any tokens of that shape
    /// are still in circulation. Unset once migration completes.
    pub legacy_secret: Option<String>,
    /// Whether session cookies carry the Secure attribute
    pub cookie_secure: bool,
}

/// Fixed token lifetime: 7 days.
pub const TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

const DEV_SECRET: &str = "development-secret-key-change-in-production";

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: DEV_SECRET.to_string(),
            issuer: "fiskal-api".to_string(),
            audience: "fiskal-web".to_string(),
            token_ttl_secs: TOKEN_TTL_SECS,
            legacy_secret: None,
            cookie_secure: false,
        }
    }
}

impl AuthConfig {
    /// Load authentication configuration from environment variables.
    ///
    /// In production a missing `AUTH_SECRET` is fatal: the service must not
    /// start and fail per-request later.
    pub fn from_env(environment: Environment) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match std::env::var("AUTH_SECRET") {
            Ok(secret) if !secret.is_empty() => config.secret = secret,
            _ if environment == Environment::Production => {
                return Err(ConfigError::MissingSigningKey);
            }
            _ => {}
        }

        if let Ok(issuer) = std::env::var("AUTH_ISSUER") {
            config.issuer = issuer;
        }
        if let Ok(audience) = std::env::var("AUTH_AUDIENCE") {
            config.audience = audience;
        }
        if let Ok(secret) = std::env::var("AUTH_LEGACY_SECRET") {
            if !secret.is_empty() {
                config.legacy_secret = Some(secret);
            }
        }

        config.cookie_secure = environment == Environment::Production;

        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("No signing secret configured (set AUTH_SECRET)")]
    MissingSigningKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_ttl_secs, 7 * 24 * 60 * 60);
        assert!(!config.auth.cookie_secure);
        assert!(!config.server.trust_proxy);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!(
            "dev".parse::<Environment>().unwrap(),
            Environment::Development
        );
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_production_requires_secret() {
        // Environment variables are process-global, so this only asserts the
        // failure path when AUTH_SECRET is absent from the test environment.
        if std::env::var("AUTH_SECRET").is_err() {
            let result = AuthConfig::from_env(Environment::Production);
            assert!(matches!(result, Err(ConfigError::MissingSigningKey)));
        }
    }

    #[test]
    fn test_development_falls_back_to_dev_secret() {
        if std::env::var("AUTH_SECRET").is_err() {
            let config = AuthConfig::from_env(Environment::Development).unwrap();
            assert_eq!(config.secret, DEV_SECRET);
            assert!(!config.cookie_secure);
        }
    }
}
