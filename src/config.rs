// Application configuration loaded once at startup
// Values come from the process environment (optionally seeded from a .env file)

use jsonwebtoken::Algorithm;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TOKEN_EXPIRE_DAYS: i64 = 30;
const DEFAULT_COOKIE_EXPIRE_DAYS: i64 = 30;
/// Upper bound for token and cookie lifetimes, keeps expiry arithmetic in range
pub const MAX_EXPIRE_DAYS: i64 = 36_500;

/// Errors raised while reading configuration from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Deployment mode, controls the `Secure` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Anything other than "production" is treated as development
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Token and cookie settings consumed by the auth layer
#[derive(Debug, Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    jwt_algorithm: Algorithm,
    token_expire_days: i64,
    cookie_expire_days: i64,
    environment: Environment,
}

impl AuthConfig {
    /// Create a config with default lifetimes, HS256 and development mode
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_algorithm: Algorithm::HS256,
            token_expire_days: DEFAULT_TOKEN_EXPIRE_DAYS,
            cookie_expire_days: DEFAULT_COOKIE_EXPIRE_DAYS,
            environment: Environment::Development,
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.jwt_algorithm = algorithm;
        self
    }

    pub fn with_token_expire_days(mut self, days: i64) -> Self {
        self.token_expire_days = days.clamp(1, MAX_EXPIRE_DAYS);
        self
    }

    pub fn with_cookie_expire_days(mut self, days: i64) -> Self {
        self.cookie_expire_days = days.clamp(1, MAX_EXPIRE_DAYS);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn jwt_algorithm(&self) -> Algorithm {
        self.jwt_algorithm
    }

    pub fn token_expire_days(&self) -> i64 {
        self.token_expire_days
    }

    pub fn cookie_expire_days(&self) -> i64 {
        self.cookie_expire_days
    }

    /// Whether session cookies carry the `Secure` attribute
    pub fn cookie_secure(&self) -> bool {
        self.environment.is_production()
    }

    /// Read auth settings through an arbitrary variable lookup
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(ConfigError::MissingEnv("JWT_SECRET"))?;

        let mut config = AuthConfig::new(jwt_secret);

        if let Some(value) = lookup("JWT_ALGORITHM") {
            config = config.with_algorithm(parse_algorithm(&value)?);
        }
        if let Some(value) = lookup("JWT_EXPIRE_DAYS") {
            config = config.with_token_expire_days(parse_days("JWT_EXPIRE_DAYS", &value)?);
        }
        if let Some(value) = lookup("JWT_COOKIE_EXPIRE") {
            config = config.with_cookie_expire_days(parse_days("JWT_COOKIE_EXPIRE", &value)?);
        }
        if let Some(value) = lookup("APP_ENV") {
            config = config.with_environment(Environment::parse(&value));
        }

        Ok(config)
    }
}

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through a variable lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnv {
                name: "PORT",
                value,
                expected: "a TCP port number",
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            database_url,
            host,
            port,
            auth: AuthConfig::from_lookup(&lookup)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    let invalid = || ConfigError::InvalidEnv {
        name: "JWT_ALGORITHM",
        value: value.to_string(),
        expected: "HS256|HS384|HS512",
    };

    // Only shared-secret algorithms make sense with JWT_SECRET
    match Algorithm::from_str(value.trim()).map_err(|_| invalid())? {
        alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) => Ok(alg),
        _ => Err(invalid()),
    }
}

fn parse_days(name: &'static str, value: &str) -> Result<i64, ConfigError> {
    match value.trim().parse::<i64>() {
        Ok(days) if (1..=MAX_EXPIRE_DAYS).contains(&days) => Ok(days),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: value.to_string(),
            expected: "a number of days between 1 and 36500",
        }),
    }
}
