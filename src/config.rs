// src/config.rs
//! Runtime settings read from the environment (and `.env` via dotenv).

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::services::leads::DEFAULT_LEAD_CAPACITY;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    /// Password for the lead listing endpoints; listing is disabled when unset.
    pub admin_password: Option<String>,
    pub market_cache_ttl: Duration,
    pub source_timeout: Duration,
    pub source_backoff: Duration,
    pub refresh_cooldown: Duration,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub forecast_rates_timeout: Duration,
    /// Most contact messages (and, separately, consultation requests) kept in memory.
    pub lead_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 5000,
            admin_password: None,
            market_cache_ttl: Duration::from_secs(15 * 60),
            source_timeout: Duration::from_secs(5),
            source_backoff: Duration::from_millis(1000),
            refresh_cooldown: Duration::from_secs(5),
            rate_limit_max: 100,
            rate_limit_window: Duration::from_secs(15 * 60),
            forecast_rates_timeout: Duration::from_secs(3),
            lead_capacity: DEFAULT_LEAD_CAPACITY,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let admin_password = lookup("ADMIN_PASSWORD")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Config {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            admin_password,
            market_cache_ttl: secs_or(&lookup, "MARKET_CACHE_TTL_SECS", defaults.market_cache_ttl)?,
            source_timeout: secs_or(&lookup, "SOURCE_TIMEOUT_SECS", defaults.source_timeout)?,
            source_backoff: Duration::from_millis(parse_or(
                &lookup,
                "SOURCE_BACKOFF_MS",
                defaults.source_backoff.as_millis() as u64,
            )?),
            refresh_cooldown: secs_or(&lookup, "REFRESH_COOLDOWN_SECS", defaults.refresh_cooldown)?,
            rate_limit_max: parse_or(&lookup, "RATE_LIMIT_MAX", defaults.rate_limit_max)?,
            rate_limit_window: secs_or(&lookup, "RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window)?,
            forecast_rates_timeout: secs_or(
                &lookup,
                "FORECAST_RATES_TIMEOUT_SECS",
                defaults.forecast_rates_timeout,
            )?,
            lead_capacity: parse_or(&lookup, "LEAD_STORE_CAPACITY", defaults.lead_capacity)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}
