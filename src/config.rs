use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use crate::auth::{provider::MAX_CLOCK_SKEW_SECS, session::MAX_SESSION_TTL_SECS, AuthMode};

/// Errors raised while reading configuration from the environment.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "{} has invalid value '{}'", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Outbound mail server settings. Absent when `MAIL_SERVER` is unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub default_sender: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub secret_key: String,
    pub auth_mode: AuthMode,
    pub session_ttl_secs: i64,
    pub session_cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub mail: Option<MailConfig>,
    pub mail_timeout_secs: u64,
    pub anonymous_email: String,
    pub provider_credentials: Option<PathBuf>,
    pub token_clock_skew_secs: u64,
}

const MIN_SECRET_LEN: usize = 32;
const MAX_MAIL_TIMEOUT_SECS: u64 = 5 * 60;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests can supply a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;
        if secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "SECRET_KEY",
                value: format!("<{} bytes>", secret_key.len()),
            });
        }

        let auth_mode: AuthMode = parse_or(&lookup, "AUTH_MODE", AuthMode::Local)?;
        let provider_credentials = lookup("IDENTITY_PROVIDER_CREDENTIALS").map(PathBuf::from);
        if auth_mode == AuthMode::Token && provider_credentials.is_none() {
            return Err(ConfigError::Missing("IDENTITY_PROVIDER_CREDENTIALS"));
        }

        let mail = match lookup("MAIL_SERVER") {
            Some(server) => Some(MailConfig {
                server,
                port: parse_or(&lookup, "MAIL_PORT", 587)?,
                username: lookup("MAIL_USERNAME"),
                password: lookup("MAIL_PASSWORD"),
                default_sender: lookup("MAIL_DEFAULT_SENDER")
                    .ok_or(ConfigError::Missing("MAIL_DEFAULT_SENDER"))?,
            }),
            None => None,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://todos.db?mode=rwc".to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", 8080)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            secret_key,
            auth_mode,
            session_ttl_secs: parse_in(
                &lookup,
                "SESSION_TTL_SECS",
                60 * 60 * 24,
                1..=MAX_SESSION_TTL_SECS,
            )?,
            session_cookie_secure: parse_or(&lookup, "SESSION_COOKIE_SECURE", true)?,
            bcrypt_cost: parse_in(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST, 4..=31)?,
            mail,
            mail_timeout_secs: parse_in(
                &lookup,
                "MAIL_TIMEOUT_SECS",
                10,
                1..=MAX_MAIL_TIMEOUT_SECS,
            )?,
            anonymous_email: lookup("ANONYMOUS_EMAIL")
                .unwrap_or_else(|| "user@example.com".to_string()),
            provider_credentials,
            token_clock_skew_secs: parse_in(
                &lookup,
                "TOKEN_CLOCK_SKEW_SECS",
                60,
                0..=MAX_CLOCK_SKEW_SECS,
            )?,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Like `parse_or`, but values outside `range` are `Invalid`.
fn parse_in<F, T>(
    lookup: &F,
    key: &'static str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + fmt::Display,
{
    let value = parse_or(lookup, key, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
    }
}
