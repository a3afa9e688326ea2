//! Server configuration from environment variables.

use std::env;

use url::Url;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Relational database URL; in-memory store when unset.
    pub database_url: Option<String>,
    /// Document database URL; in-memory store when unset.
    pub document_database_url: Option<String>,
    /// Server port to listen on.
    pub port: u16,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// CORS allowed origins (comma-separated or "*" for all).
    pub cors_allowed_origins: String,
    /// HS256 key used to validate bearer tokens. Empty disables JWT auth.
    pub jwt_secret: String,
    /// Required `iss` claim, if any.
    pub jwt_issuer: Option<String>,
    /// Accept the `X-User-Id` header as identity.
    pub allow_dev_identity: bool,
    /// Base for absolute hrefs; relative paths when unset.
    pub public_base_url: Option<Url>,
    pub environment: Environment,
    /// Delete a board's notes from the document store when it is destroyed.
    pub purge_notes_on_board_delete: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            document_database_url: None,
            port: 3000,
            log_level: "info".to_string(),
            cors_allowed_origins: "*".to_string(),
            jwt_secret: String::new(),
            jwt_issuer: None,
            allow_dev_identity: false,
            public_base_url: None,
            environment: Environment::Development,
            purge_notes_on_board_delete: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `DATABASE_URL`: Relational database (default: in-memory)
    /// - `DOCUMENT_DATABASE_URL`: Document database (default: in-memory)
    /// - `PORT`: Server port (default: 3000)
    /// - `LOG_LEVEL`: Logging level (default: "info")
    /// - `CORS_ALLOWED_ORIGINS`: Allowed CORS origins (default: "*")
    /// - `JWT_SECRET`: HS256 token validation key (required in production)
    /// - `JWT_ISSUER`: Required token issuer
    /// - `ALLOW_DEV_IDENTITY`: Accept `X-User-Id` (default: false)
    /// - `PUBLIC_BASE_URL`: Absolute href base
    /// - `APP_ENV`: `production` or `development` (default: development)
    /// - `PURGE_NOTES_ON_BOARD_DELETE`: (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT".to_string(),
                reason: format!("'{}' is not a port number", raw),
            })?,
            None => defaults.port,
        };

        let public_base_url = non_empty("PUBLIC_BASE_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
                    name: "PUBLIC_BASE_URL".to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let environment = match non_empty("APP_ENV").map(|v| v.to_lowercase()).as_deref() {
            None | Some("development" | "dev" | "test") => Environment::Development,
            Some("production" | "prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "APP_ENV".to_string(),
                    reason: format!("unknown environment '{}'", other),
                });
            }
        };

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_default();
        if environment == Environment::Production && jwt_secret.is_empty() {
            return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()));
        }

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            document_database_url: non_empty("DOCUMENT_DATABASE_URL"),
            port,
            log_level: non_empty("LOG_LEVEL").unwrap_or(defaults.log_level),
            cors_allowed_origins: non_empty("CORS_ALLOWED_ORIGINS")
                .unwrap_or(defaults.cors_allowed_origins),
            jwt_secret,
            jwt_issuer: non_empty("JWT_ISSUER"),
            allow_dev_identity: flag(lookup("ALLOW_DEV_IDENTITY"), false),
            public_base_url,
            environment,
            purge_notes_on_board_delete: flag(
                lookup("PURGE_NOTES_ON_BOARD_DELETE"),
                defaults.purge_notes_on_board_delete,
            ),
        })
    }

    /// Get the socket address for the server.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Unknown routes in hrefs are fatal outside production.
    pub fn strict_hrefs(&self) -> bool {
        self.environment != Environment::Production
    }
}

fn flag(raw: Option<String>, default: bool) -> bool {
    raw.and_then(|v| planner_core::representation::parse_bool(&v))
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid environment variable value.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}
