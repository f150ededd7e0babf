//! Environment-driven configuration.
//!
//! Resolved once at startup and passed explicitly into the gateway and
//! router; nothing reads the environment after `Config::from_env`
//! returns. Writer and reader credentials fall back to the shared
//! `DB_HOST`/`DB_PORT`/`DB_USER`/`DB_PASSWORD`/`DB_NAME` variables when
//! the role-specific ones are unset.

use axum::http::HeaderValue;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_NAME: &str = "defaultdb";
pub const DEFAULT_TABLE_NAME: &str = "patient";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: expected a port number")]
    InvalidPort { key: &'static str, value: String },

    #[error("invalid CORS_ORIGIN '{0}': not a valid header value")]
    InvalidOrigin(String),

    #[error("missing required variable {key} (or its fallback {fallback})")]
    Missing {
        key: &'static str,
        fallback: &'static str,
    },
}

/// One database login. The writer set is used only for schema creation
/// and inserts, the reader set only for SELECT execution.
#[derive(Debug, Clone)]
pub struct DbCredentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Immutable process configuration; lifetime = process lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cors_origin: HeaderValue,
    pub db_name: String,
    pub table_name: String,
    pub writer: DbCredentials,
    pub reader: DbCredentials,
    /// PEM content (not a path); enables certificate-verified TLS on
    /// database connections when present.
    pub ssl_ca: Option<String>,
}

impl Config {
    /// Load from the process environment (after `dotenvy` has run).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Tests inject a map here
    /// instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_port(&lookup, "PORT", DEFAULT_PORT)?;

        let origin = lookup("CORS_ORIGIN").unwrap_or_else(|| "*".to_string());
        let cors_origin = HeaderValue::from_str(&origin)
            .map_err(|_| ConfigError::InvalidOrigin(origin.clone()))?;

        let db_name = lookup("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
        let table_name = lookup("DB_TABLE").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

        let writer = credentials(&lookup, Role::Writer, &db_name)?;
        let reader = credentials(&lookup, Role::Reader, &db_name)?;

        let ssl_ca = lookup("DB_SSL_CA").filter(|ca| !ca.trim().is_empty());

        Ok(Self {
            port,
            cors_origin,
            db_name,
            table_name,
            writer,
            reader,
            ssl_ca,
        })
    }
}

#[derive(Copy, Clone)]
enum Role {
    Writer,
    Reader,
}

impl Role {
    fn key(self, suffix: &str) -> &'static str {
        match (self, suffix) {
            (Role::Writer, "HOST") => "DB_WRITER_HOST",
            (Role::Writer, "PORT") => "DB_WRITER_PORT",
            (Role::Writer, "USER") => "DB_WRITER_USER",
            (Role::Writer, "PASSWORD") => "DB_WRITER_PASSWORD",
            (Role::Writer, "NAME") => "DB_WRITER_NAME",
            (Role::Reader, "HOST") => "DB_READER_HOST",
            (Role::Reader, "PORT") => "DB_READER_PORT",
            (Role::Reader, "USER") => "DB_READER_USER",
            (Role::Reader, "PASSWORD") => "DB_READER_PASSWORD",
            (Role::Reader, "NAME") => "DB_READER_NAME",
            _ => unreachable!("unknown credential key suffix"),
        }
    }
}

fn credentials(
    lookup: &impl Fn(&str) -> Option<String>,
    role: Role,
    db_name: &str,
) -> Result<DbCredentials, ConfigError> {
    let host = lookup(role.key("HOST"))
        .or_else(|| lookup("DB_HOST"))
        .ok_or(ConfigError::Missing {
            key: role.key("HOST"),
            fallback: "DB_HOST",
        })?;
    let user = lookup(role.key("USER"))
        .or_else(|| lookup("DB_USER"))
        .ok_or(ConfigError::Missing {
            key: role.key("USER"),
            fallback: "DB_USER",
        })?;

    let port_key = role.key("PORT");
    let port = match lookup(port_key).or_else(|| lookup("DB_PORT")) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort {
            key: port_key,
            value: raw,
        })?,
        None => DEFAULT_DB_PORT,
    };

    let password = lookup(role.key("PASSWORD"))
        .or_else(|| lookup("DB_PASSWORD"))
        .unwrap_or_default();

    let database = lookup(role.key("NAME")).unwrap_or_else(|| db_name.to_string());

    Ok(DbCredentials {
        host,
        port,
        user,
        password,
        database,
    })
}

fn parse_port(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u16,
) -> Result<u16, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidPort { key, value: raw }),
        None => Ok(default),
    }
}
