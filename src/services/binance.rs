//! Binance USD-M futures klines.

use super::http::HttpFetcher;
use super::market_data::{
    normalize_candles, parse_millis, parse_number, DataSource, DataUnavailableError,
    MarketDataGateway, Timeframe,
};
use crate::models::Candle;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;
use url::Url;

pub const DEFAULT_BINANCE_FUTURES_URL: &str = "https://fapi.binance.com";
const KLINES_PATH: &str = "/fapi/v1/klines";
const MAX_LIMIT: usize = 1500;
/// Binance error code for an unknown symbol.
const INVALID_SYMBOL: &str = "-1121";

pub struct BinanceFuturesGateway {
    base_url: Url,
    http: HttpFetcher,
}

impl BinanceFuturesGateway {
    pub fn new(base_url: &str, http: HttpFetcher) -> Result<Self, DataUnavailableError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            http,
        })
    }

    fn klines_url(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Url, DataUnavailableError> {
        let mut url = self.base_url.join(KLINES_PATH)?;
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("interval", timeframe.as_str())
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl MarketDataGateway for BinanceFuturesGateway {
    fn source(&self) -> DataSource {
        DataSource::Binance
    }

    fn format_symbol(&self, symbol: &str) -> String {
        symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase()
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, DataUnavailableError> {
        let formatted = self.format_symbol(symbol);
        let url = self.klines_url(&formatted, timeframe, limit.clamp(1, MAX_LIMIT))?;

        let body = match self.http.get_json(&url).await {
            Err(DataUnavailableError::Status { status: 400, body }) if body.contains(INVALID_SYMBOL) => {
                return Err(DataUnavailableError::UnsupportedSymbol(formatted));
            }
            other => other?,
        };

        let candles = parse_klines(&body)?;
        info!(
            source = %DataSource::Binance,
            symbol = %formatted,
            timeframe = %timeframe,
            count = candles.len(),
            "fetched candles"
        );
        Ok(normalize_candles(candles, limit))
    }
}

/// Rows look like `[openTimeMs, "open", "high", "low", "close", "volume", ...]`.
fn parse_klines(body: &Value) -> Result<Vec<Candle>, DataUnavailableError> {
    let rows = body
        .as_array()
        .ok_or_else(|| DataUnavailableError::Parse("klines response is not an array".to_string()))?;

    rows.iter()
        .map(|row| {
            let fields = row
                .as_array()
                .filter(|fields| fields.len() >= 6)
                .ok_or_else(|| DataUnavailableError::Parse(format!("malformed kline row: {}", row)))?;
            let candle = Candle::new(
                parse_millis(&fields[0], "openTime")? / 1000,
                parse_number(&fields[1], "open")?,
                parse_number(&fields[2], "high")?,
                parse_number(&fields[3], "low")?,
                parse_number(&fields[4], "close")?,
            );
            Ok(candle.with_volume(parse_number(&fields[5], "volume")?))
        })
        .collect()
}
