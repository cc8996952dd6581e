//! Environment-driven configuration.
//!
//! Every setting has a default so the dashboard starts with an empty
//! environment. Values that fail to parse fall back to the default with a
//! warning.

use crate::common::RetryPolicy;
use crate::services::binance::DEFAULT_BINANCE_FUTURES_URL;
use crate::services::bingx::DEFAULT_BINGX_URL;
use crate::services::{DataSource, Timeframe};
use crate::sync::SyncConfig;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Deployment environment from `APP_ENV` (`sandbox` when unset).
pub fn get_environment() -> String {
    env::var("APP_ENV").unwrap_or_else(|_| "sandbox".to_string())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(err) => {
                warn!(key, value = %raw, error = %err, "invalid setting, using default");
                default
            }
        },
        _ => default,
    }
}

fn env_millis(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_parse(key, default_ms))
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub timeout: Duration,
    /// Total attempts per request.
    pub max_attempts: usize,
    /// First retry delay; doubles on each further retry.
    pub retry_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(15_000),
            max_attempts: 3,
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

impl HttpConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_attempts, self.retry_delay, 2.0, self.retry_delay * 8)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub provider: DataSource,
    pub candle_limit: usize,
    pub binance_url: String,
    pub bingx_url: String,
    pub http: HttpConfig,
    pub sync: SyncConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::H1,
            provider: DataSource::Binance,
            candle_limit: 500,
            binance_url: DEFAULT_BINANCE_FUTURES_URL.to_string(),
            bingx_url: DEFAULT_BINGX_URL.to_string(),
            http: HttpConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let sync_defaults = SyncConfig::default();

        let attach_attempts = env_parse(
            "SYNC_ATTACH_MAX_ATTEMPTS",
            sync_defaults.attach_retry.max_attempts,
        );
        let attach_retry = RetryPolicy::fixed(
            attach_attempts,
            env_millis("SYNC_ATTACH_RETRY_MS", 300),
        );

        Self {
            symbol: env_parse("TRADEROAD_SYMBOL", defaults.symbol),
            timeframe: env_parse("TRADEROAD_TIMEFRAME", defaults.timeframe),
            provider: env_parse("TRADEROAD_PROVIDER", defaults.provider),
            candle_limit: env_parse("TRADEROAD_CANDLE_LIMIT", defaults.candle_limit).max(1),
            binance_url: env_parse("BINANCE_FUTURES_URL", defaults.binance_url),
            bingx_url: env_parse("BINGX_URL", defaults.bingx_url),
            http: HttpConfig {
                timeout: env_millis("HTTP_TIMEOUT_MS", 15_000),
                max_attempts: env_parse("HTTP_MAX_ATTEMPTS", defaults.http.max_attempts).max(1),
                retry_delay: env_millis("HTTP_RETRY_DELAY_MS", 1_000),
            },
            sync: SyncConfig {
                debounce: env_millis("SYNC_DEBOUNCE_MS", 150),
                attach_delay: env_millis("SYNC_ATTACH_DELAY_MS", 200),
                attach_retry,
            },
        }
    }
}
