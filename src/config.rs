use std::env;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;

/// Accepted range for `TOKEN_TTL_DAYS`.
pub const TOKEN_TTL_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=3650;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub token_ttl_days: i64,
    pub cookie_secure: bool,
    pub admin_email: String,
    pub admin_password: String,
    pub seed_sample_data: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("token_ttl_days", &self.token_ttl_days)
            .field("cookie_secure", &self.cookie_secure)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .field("seed_sample_data", &self.seed_sample_data)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            token_ttl_days: 7,
            cookie_secure: false,
            admin_email: "admin@rides.local".to_string(),
            admin_password: "admin123".to_string(),
            seed_sample_data: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
            token_ttl_days: parse_ttl_days(defaults.token_ttl_days)?,
            cookie_secure: parse_var("COOKIE_SECURE", defaults.cookie_secure)?,
            admin_email: env::var("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            seed_sample_data: parse_var("SEED_SAMPLE_DATA", defaults.seed_sample_data)?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Token lifetime, clamped to [`TOKEN_TTL_DAYS_RANGE`].
    pub fn token_ttl(&self) -> Duration {
        let days = self
            .token_ttl_days
            .clamp(*TOKEN_TTL_DAYS_RANGE.start(), *TOKEN_TTL_DAYS_RANGE.end());
        Duration::days(days)
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_ttl_days(default: i64) -> Result<i64, ConfigError> {
    let days = parse_var("TOKEN_TTL_DAYS", default)?;
    check_ttl_days(days)
}

fn check_ttl_days(days: i64) -> Result<i64, ConfigError> {
    if TOKEN_TTL_DAYS_RANGE.contains(&days) {
        Ok(days)
    } else {
        Err(ConfigError::Invalid {
            name: "TOKEN_TTL_DAYS",
            value: days.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_issue_week_long_tokens() {
        let config = Config::default();
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.server_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn unset_variable_falls_back_to_default() {
        let port: u16 = parse_var("RIDE_ADMIN_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn out_of_range_ttl_is_rejected() {
        assert_eq!(check_ttl_days(30).unwrap(), 30);
        assert!(matches!(
            check_ttl_days(0),
            Err(ConfigError::Invalid { name: "TOKEN_TTL_DAYS", .. })
        ));
        assert!(check_ttl_days(i64::MAX).is_err());

        let config = Config {
            token_ttl_days: i64::MAX,
            ..Config::default()
        };
        assert_eq!(config.token_ttl(), Duration::days(3650));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = Config {
            database_url: "postgres://app:hunter2@db/rides".to_string(),
            admin_password: "s3cret-admin".to_string(),
            ..Config::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("s3cret-admin"), "{printed}");
        assert!(!printed.contains("hunter2"), "{printed}");
        assert!(printed.contains("admin@rides.local"), "{printed}");
    }
}
