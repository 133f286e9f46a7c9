use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

pub const DEFAULT_JWT_SECRET: &str = "defaultkey";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::Invalid {
                key: "ENVIRONMENT",
                reason: format!("unknown environment '{}'", other),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Allowed CORS origins. `*` in the environment maps to `Any`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub app_version: String,
    pub host: String,
    pub port: u16,
    pub environment: Environment,

    pub database_url: String,
    pub database_pool_size: u32,

    pub jwt_secret_key: String,
    pub jwt_algorithm: String,
    pub access_token_expire_minutes: i64,

    pub firebase_credentials_path: String,
    pub firebase_project_id: Option<String>,
    pub firebase_web_api_key: Option<String>,
    pub firebase_auth_emulator_host: Option<String>,

    pub tomtom_api_key: String,
    pub tomtom_base_url: String,

    pub cors_origins: CorsOrigins,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|key| env::var(key).ok());

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Builds the configuration from an arbitrary key lookup. Missing or
    /// unparsable values fall back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let parsed = |key: &'static str, default: &str| -> String {
            get(key).unwrap_or_else(|| default.to_string())
        };

        let port = match get("PORT").map(|p| p.parse::<u16>()) {
            Some(Ok(port)) => port,
            Some(Err(_)) => {
                warn!("PORT is not a valid port number, using 8000");
                8000
            }
            None => 8000,
        };

        let database_pool_size = match get("DATABASE_POOL_SIZE").map(|s| s.parse::<u32>()) {
            Some(Ok(size)) if size > 0 => size,
            Some(_) => {
                warn!("DATABASE_POOL_SIZE is invalid, using 8");
                8
            }
            None => 8,
        };

        let access_token_expire_minutes =
            match get("ACCESS_TOKEN_EXPIRE_MINUTES").map(|s| s.parse::<i64>()) {
                Some(Ok(minutes)) if minutes > 0 => minutes,
                Some(_) => {
                    warn!("ACCESS_TOKEN_EXPIRE_MINUTES is invalid, using 30");
                    30
                }
                None => 30,
            };

        let environment = match get("ENVIRONMENT").map(|s| s.parse::<Environment>()) {
            Some(Ok(env)) => env,
            Some(Err(e)) => {
                warn!("{}, using development", e);
                Environment::Development
            }
            None => Environment::Development,
        };

        let jwt_secret_key = get("JWT_SECRET_KEY").unwrap_or_else(|| {
            warn!("JWT_SECRET_KEY not set, using insecure default");
            DEFAULT_JWT_SECRET.to_string()
        });

        let tomtom_api_key = get("TOMTOM_API_KEY").unwrap_or_else(|| {
            warn!("TOMTOM_API_KEY not set, using empty value");
            String::new()
        });

        Self {
            app_name: parsed("APP_NAME", "HealXir"),
            app_version: parsed("APP_VERSION", "1.0.0"),
            host: parsed("HOST", "0.0.0.0"),
            port,
            environment,
            database_url: parsed("DATABASE_URL", "sqlite://./healxir.db"),
            database_pool_size,
            jwt_secret_key,
            jwt_algorithm: parsed("JWT_ALGORITHM", "HS256"),
            access_token_expire_minutes,
            firebase_credentials_path: parsed(
                "FIREBASE_CREDENTIALS_PATH",
                "./firebase_credentials.json",
            ),
            firebase_project_id: get("FIREBASE_PROJECT_ID"),
            firebase_web_api_key: get("FIREBASE_WEB_API_KEY"),
            firebase_auth_emulator_host: get("FIREBASE_AUTH_EMULATOR_HOST"),
            tomtom_api_key,
            tomtom_base_url: parsed("TOMTOM_BASE_URL", "https://api.tomtom.com")
                .trim_end_matches('/')
                .to_string(),
            cors_origins: parse_cors_origins(get("BACKEND_CORS_ORIGINS").as_deref()),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.tomtom_api_key.is_empty()
            && (self.firebase_auth_emulator_host.is_some()
                || !self.firebase_credentials_path.is_empty())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn is_password_verification_enabled(&self) -> bool {
        self.firebase_web_api_key.is_some()
    }

    /// Rejects settings that must never reach production.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.jwt_algorithm.as_str(), "HS256" | "HS384" | "HS512") {
            return Err(ConfigError::Invalid {
                key: "JWT_ALGORITHM",
                reason: format!("'{}' is not an HMAC algorithm", self.jwt_algorithm),
            });
        }

        if self.is_production() {
            if self.jwt_secret_key == DEFAULT_JWT_SECRET {
                return Err(ConfigError::Invalid {
                    key: "JWT_SECRET_KEY",
                    reason: "the default secret is not allowed in production".to_string(),
                });
            }
            if self.firebase_auth_emulator_host.is_some() {
                return Err(ConfigError::Invalid {
                    key: "FIREBASE_AUTH_EMULATOR_HOST",
                    reason: "the auth emulator is not allowed in production".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_cors_origins(raw: Option<&str>) -> CorsOrigins {
    let Some(raw) = raw else {
        return CorsOrigins::Any;
    };

    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| o.trim_end_matches('/').to_string())
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(origins)
    }
}
