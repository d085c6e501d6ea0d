//! Runtime configuration, read from the environment (and `.env` when present).

use std::{env, fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub seed_on_start: bool,
    pub admin_password: String,
    pub session_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub secure_cookies: bool,
    /// scrypt cost exponent for new password hashes.
    pub scrypt_log_n: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://vinyl_store.db".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            seed_on_start: true,
            admin_password: "admin123".to_string(),
            session_ttl: Duration::from_secs(72 * 60 * 60),
            session_sweep_interval: Duration::from_secs(300),
            secure_cookies: false,
            scrypt_log_n: 15,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_ok() {
            info!("Loaded environment from .env");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let ttl_hours: u64 = parse_or(&lookup, "VINYL_SESSION_TTL_HOURS", 72)?;
        let sweep_secs: u64 = parse_or(&lookup, "VINYL_SESSION_SWEEP_SECS", 300)?;

        Ok(Self {
            database_url: lookup("VINYL_DATABASE_URL").unwrap_or(defaults.database_url),
            host: lookup("VINYL_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "VINYL_PORT", defaults.port)?,
            seed_on_start: parse_bool_or(&lookup, "VINYL_SEED", defaults.seed_on_start)?,
            admin_password: lookup("VINYL_ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            session_ttl: session_ttl(ttl_hours)?,
            session_sweep_interval: Duration::from_secs(sweep_secs.max(1)),
            secure_cookies: parse_bool_or(&lookup, "VINYL_SECURE_COOKIES", defaults.secure_cookies)?,
            scrypt_log_n: parse_or(&lookup, "VINYL_SCRYPT_LOG_N", defaults.scrypt_log_n)?,
        })
    }

    /// Cheap hashing and an in-memory database; for tests only.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            seed_on_start: false,
            scrypt_log_n: 4,
            ..Self::default()
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => {
            debug!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        }
    }
}

/// The TTL must fit a `chrono` duration and keep `now + ttl` representable.
fn session_ttl(hours: u64) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        key: "VINYL_SESSION_TTL_HOURS",
        value: hours.to_string(),
        reason: reason.to_string(),
    };
    let secs = hours
        .checked_mul(60 * 60)
        .ok_or_else(|| invalid("session lifetime is too long"))?;
    let ttl = Duration::from_secs(secs);
    let signed = chrono::Duration::from_std(ttl).map_err(|_| invalid("session lifetime is too long"))?;
    chrono::Utc::now()
        .checked_add_signed(signed)
        .ok_or_else(|| invalid("session lifetime is too long"))?;
    Ok(ttl)
}

fn parse_bool_or<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value,
                reason: "expected a boolean".to_string(),
            }),
        },
    }
}
