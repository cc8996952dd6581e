//! Market data provider interface and the types shared by all providers.

use crate::models::Candle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fetches recent OHLCV history from one exchange.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    fn source(&self) -> DataSource;

    /// Provider-specific spelling of a symbol such as `BTC/USDT`.
    fn format_symbol(&self, symbol: &str) -> String;

    /// At most `limit` most recent candles, ascending by time.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, DataUnavailableError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Binance,
    Bingx,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Binance => "Binance Futures",
            DataSource::Bingx => "BingX Futures",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Binance => "binance",
            DataSource::Bingx => "bingx",
        }
    }

    pub fn all() -> [DataSource; 2] {
        [DataSource::Binance, DataSource::Bingx]
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = SelectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(DataSource::Binance),
            "bingx" => Ok(DataSource::Bingx),
            _ => Err(SelectionParseError::Provider(s.to_string())),
        }
    }
}

/// Candle interval, spelled the way both exchanges spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "6h")]
    H6,
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "3d")]
    D3,
    #[serde(rename = "1w")]
    W1,
    #[serde(rename = "1M")]
    Mo1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 14] = [
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H12,
        Timeframe::D1,
        Timeframe::D3,
        Timeframe::W1,
        Timeframe::Mo1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
            Timeframe::D3 => "3d",
            Timeframe::W1 => "1w",
            Timeframe::Mo1 => "1M",
        }
    }

    /// Nominal bucket length. A month counts as 30 days.
    pub fn seconds(&self) -> i64 {
        const MIN: i64 = 60;
        const HOUR: i64 = 60 * MIN;
        const DAY: i64 = 24 * HOUR;
        match self {
            Timeframe::M1 => MIN,
            Timeframe::M3 => 3 * MIN,
            Timeframe::M5 => 5 * MIN,
            Timeframe::M15 => 15 * MIN,
            Timeframe::M30 => 30 * MIN,
            Timeframe::H1 => HOUR,
            Timeframe::H2 => 2 * HOUR,
            Timeframe::H4 => 4 * HOUR,
            Timeframe::H6 => 6 * HOUR,
            Timeframe::H12 => 12 * HOUR,
            Timeframe::D1 => DAY,
            Timeframe::D3 => 3 * DAY,
            Timeframe::W1 => 7 * DAY,
            Timeframe::Mo1 => 30 * DAY,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = SelectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // "1M" is a month; every other unit is case-insensitive.
        if s == "1M" {
            return Ok(Timeframe::Mo1);
        }
        let lowered = s.to_ascii_lowercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| *tf != Timeframe::Mo1 && tf.as_str() == lowered)
            .ok_or_else(|| SelectionParseError::Timeframe(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionParseError {
    #[error("unknown data provider '{0}'")]
    Provider(String),
    #[error("unknown timeframe '{0}'")]
    Timeframe(String),
}

/// Why a provider could not deliver candles.
#[derive(Debug, Error)]
pub enum DataUnavailableError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("rate limited by provider")]
    RateLimited,
    #[error("symbol '{0}' is not listed by the provider")]
    UnsupportedSymbol(String),
    #[error("provider error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("unexpected response payload: {0}")]
    Parse(String),
    #[error("invalid provider URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("no gateway registered for {0}")]
    UnknownProvider(DataSource),
}

impl DataUnavailableError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            DataUnavailableError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            DataUnavailableError::Status { status, .. } => *status >= 500,
            DataUnavailableError::RateLimited => true,
            _ => false,
        }
    }
}

/// Exchanges send prices as strings or numbers depending on the endpoint.
pub fn parse_number(value: &Value, field: &str) -> Result<f64, DataUnavailableError> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| DataUnavailableError::Parse(format!("field '{}' is not a number: {}", field, value)))
}

/// Millisecond timestamp field, as string or integer.
pub fn parse_millis(value: &Value, field: &str) -> Result<i64, DataUnavailableError> {
    let parsed = match value {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    parsed.ok_or_else(|| DataUnavailableError::Parse(format!("field '{}' is not a timestamp: {}", field, value)))
}

/// Sort by time, keep the last candle for a duplicated time and truncate to
/// the `limit` most recent.
pub fn normalize_candles(mut candles: Vec<Candle>, limit: usize) -> Vec<Candle> {
    candles.sort_by_key(|c| c.time);
    let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(last) if last.time == candle.time => *last = candle,
            _ => deduped.push(candle),
        }
    }
    if deduped.len() > limit {
        deduped.drain(..deduped.len() - limit);
    }
    deduped
}
