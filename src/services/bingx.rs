//! BingX perpetual swap klines.

use super::http::HttpFetcher;
use super::market_data::{
    normalize_candles, parse_millis, parse_number, DataSource, DataUnavailableError,
    MarketDataGateway, Timeframe,
};
use crate::models::Candle;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use url::Url;

pub const DEFAULT_BINGX_URL: &str = "https://open-api.bingx.com";
const KLINES_PATH: &str = "/openApi/swap/v2/quote/klines";
const MAX_LIMIT: usize = 1440;
const QUOTE_ASSETS: [&str; 4] = ["USDT", "USDC", "BUSD", "USD"];

#[derive(Debug, Deserialize)]
struct KlinesEnvelope {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Option<Vec<Value>>,
}

pub struct BingxGateway {
    base_url: Url,
    http: HttpFetcher,
}

impl BingxGateway {
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
impl MarketDataGateway for BingxGateway {
    fn source(&self) -> DataSource {
        DataSource::Bingx
    }

    /// `ETH/USDT` and `ETHUSDT` both become `ETH-USDT`.
    fn format_symbol(&self, symbol: &str) -> String {
        let upper = symbol.trim().to_ascii_uppercase().replace('/', "-");
        if upper.contains('-') {
            return upper;
        }
        QUOTE_ASSETS
            .iter()
            .find_map(|quote| {
                upper
                    .strip_suffix(quote)
                    .filter(|base| !base.is_empty())
                    .map(|base| format!("{}-{}", base, quote))
            })
            .unwrap_or(upper)
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, DataUnavailableError> {
        let formatted = self.format_symbol(symbol);
        let url = self.klines_url(&formatted, timeframe, limit.clamp(1, MAX_LIMIT))?;
        let body = self.http.get_json(&url).await?;

        let envelope: KlinesEnvelope = serde_json::from_value(body)
            .map_err(|err| DataUnavailableError::Parse(err.to_string()))?;
        if envelope.code != 0 {
            if envelope.msg.to_ascii_lowercase().contains("symbol") {
                return Err(DataUnavailableError::UnsupportedSymbol(formatted));
            }
            return Err(DataUnavailableError::Api {
                code: envelope.code,
                message: envelope.msg,
            });
        }

        let candles = envelope
            .data
            .unwrap_or_default()
            .iter()
            .map(parse_kline)
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            source = %DataSource::Bingx,
            symbol = %formatted,
            timeframe = %timeframe,
            count = candles.len(),
            "fetched candles"
        );
        Ok(normalize_candles(candles, limit))
    }
}

fn parse_kline(row: &Value) -> Result<Candle, DataUnavailableError> {
    let field = |name: &str| {
        row.get(name)
            .ok_or_else(|| DataUnavailableError::Parse(format!("kline is missing '{}': {}", name, row)))
    };
    let candle = Candle::new(
        parse_millis(field("time")?, "time")? / 1000,
        parse_number(field("open")?, "open")?,
        parse_number(field("high")?, "high")?,
        parse_number(field("low")?, "low")?,
        parse_number(field("close")?, "close")?,
    );
    match row.get("volume") {
        Some(volume) => Ok(candle.with_volume(parse_number(volume, "volume")?)),
        None => Ok(candle),
    }
}
